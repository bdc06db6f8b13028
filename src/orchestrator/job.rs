/*!
 * Translation job model and lifecycle transitions.
 */

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::app_config::{Config, MAX_THREADS, MIN_THREADS};
use crate::errors::{ConfigError, JobStateError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::orchestrator::progress::ProgressTracker;

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Whether the engine may reuse its cached translations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    UseCache,
    IgnoreCache,
}

impl CachePolicy {
    pub fn from_ignore_flag(ignore_cache: bool) -> Self {
        if ignore_cache { Self::IgnoreCache } else { Self::UseCache }
    }

    pub fn ignores_cache(&self) -> bool {
        matches!(self, Self::IgnoreCache)
    }
}

/// Per-job options, fixed once the job exists
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub source_language: String,
    pub target_language: String,
    pub threads: u8,
    pub skip_font_subsetting: bool,
    pub cache_policy: CachePolicy,
}

impl JobConfig {
    /// Build job options, checking language tags and the thread range
    pub fn new(
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        threads: u8,
        skip_font_subsetting: bool,
        cache_policy: CachePolicy,
    ) -> Result<Self, ConfigError> {
        let source_language = source_language.into();
        let target_language = target_language.into();

        for code in [&source_language, &target_language] {
            language_utils::validate_language_tag(code)
                .map_err(|e| ConfigError::InvalidOption(e.to_string()))?;
        }

        if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
            return Err(ConfigError::InvalidOption(format!(
                "thread count must be between {} and {}, got {}",
                MIN_THREADS, MAX_THREADS, threads
            )));
        }

        Ok(Self {
            source_language: source_language.trim().to_string(),
            target_language: target_language.trim().to_string(),
            threads,
            skip_font_subsetting,
            cache_policy,
        })
    }

    /// Job options from the configured defaults
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.source_language.clone(),
            config.target_language.clone(),
            config.threads,
            config.skip_font_subsetting,
            CachePolicy::from_ignore_flag(config.ignore_cache),
        )
    }
}

/// The uploaded document a job translates
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub file_name: String,
    pub bytes: Bytes,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name without its extension, used to name downloads
    pub fn base_name(&self) -> String {
        FileManager::base_name(&self.file_name)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Point-in-time view of a job for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Option<String>,
    pub state: JobState,
    pub progress: f64,
    pub status: String,
    pub file_name: Option<String>,
}

impl JobSnapshot {
    /// Snapshot shown before any job was submitted
    pub fn idle() -> Self {
        Self {
            id: None,
            state: JobState::Idle,
            progress: 0.0,
            status: String::new(),
            file_name: None,
        }
    }
}

/// One translation request from submission to a terminal state
#[derive(Debug)]
pub struct Job {
    id: String,
    config: JobConfig,
    document: Arc<SourceDocument>,
    state: RwLock<JobState>,
    progress: Arc<ProgressTracker>,
}

impl Job {
    pub fn new(document: Arc<SourceDocument>, config: JobConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            document,
            state: RwLock::new(JobState::Idle),
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Short id for log lines
    pub fn short_id(&self) -> &str {
        &self.id[..8]
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn document(&self) -> &Arc<SourceDocument> {
        &self.document
    }

    pub fn state(&self) -> JobState {
        *self.state.read()
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Move `from` -> `to` and update progress under the state write lock
    ///
    /// `snapshot` reads progress under the same lock, so the new state is
    /// never observed together with the progress of the previous one.
    fn transition<F>(&self, from: JobState, to: JobState, update: F) -> Result<(), JobStateError>
    where
        F: FnOnce(&ProgressTracker),
    {
        let mut state = self.state.write();
        if *state != from {
            return Err(JobStateError { from: *state, to });
        }
        update(&self.progress);
        *state = to;
        Ok(())
    }

    /// Idle -> Running
    pub(crate) fn start(&self, status: &str) -> Result<(), JobStateError> {
        self.transition(JobState::Idle, JobState::Running, |progress| {
            progress.apply_if_newer(0.0, status);
        })
    }

    /// Running -> Completed, progress pinned at 1.0
    pub(crate) fn succeed(&self, status: &str) -> Result<(), JobStateError> {
        self.transition(JobState::Running, JobState::Completed, |progress| progress.complete(status))
    }

    /// Running -> Failed, progress frozen, status set to the error
    pub(crate) fn fail(&self, status: String) -> Result<(), JobStateError> {
        self.transition(JobState::Running, JobState::Failed, |progress| progress.freeze(status))
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.read();
        let (progress, status) = self.progress.snapshot();
        JobSnapshot {
            id: Some(self.id.clone()),
            state: *state,
            progress,
            status,
            file_name: Some(self.document.file_name.clone()),
        }
    }
}
