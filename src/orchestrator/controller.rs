/*!
 * Job state machine: runs one translation job at a time.
 *
 * `submit` checks the upload and the credentials, installs a new job and
 * drives it through font resolution and the engine call. Everything the
 * presentation layer shows comes from `snapshot`, which can be read while
 * a job is running.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::access::AccessGate;
use crate::app_config::{CredentialSource, EngineCredentials};
use crate::engine::TranslationAdapter;
use crate::errors::SubmitError;
use crate::file_utils::FileManager;
use crate::fonts::ResourceResolver;
use crate::orchestrator::gate;
use crate::orchestrator::job::{Job, JobConfig, JobSnapshot, JobState, SourceDocument};
use crate::orchestrator::progress::{Phase, PhaseReporter};
use crate::orchestrator::store::{ArtifactStore, DocumentCache, TranslationResult, Upload};

/// Status of a job whose submission was dropped before it finished
pub const ABANDONED_STATUS: &str = "Error: job abandoned";

/// Fails a job that is still running when `submit` goes away
struct AbandonGuard<'a>(&'a Job);

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let job = self.0;
        if job.state().is_terminal() {
            return;
        }
        warn!("Job {} abandoned before it finished", job.short_id());
        if let Err(e) = job.fail(ABANDONED_STATUS.to_string()) {
            error!("Job {}: {}", job.short_id(), e);
        }
    }
}

/// Coordinates the gate, font resolution, the engine call and the stores
pub struct JobController {
    credentials: Arc<dyn CredentialSource>,
    adapter: TranslationAdapter,
    resources: ResourceResolver,
    access: AccessGate,
    unlocked: AtomicBool,
    documents: DocumentCache,
    artifacts: ArtifactStore,
    current: Mutex<Option<Arc<Job>>>,
}

impl JobController {
    pub fn new(
        adapter: TranslationAdapter,
        resources: ResourceResolver,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            credentials,
            adapter,
            resources,
            access: AccessGate::open(),
            unlocked: AtomicBool::new(true),
            documents: DocumentCache::new(),
            artifacts: ArtifactStore::new(),
            current: Mutex::new(None),
        }
    }

    /// Require a passphrase before submissions are accepted
    pub fn with_access_gate(mut self, access: AccessGate) -> Self {
        self.unlocked = AtomicBool::new(access.is_open());
        self.access = access;
        self
    }

    /// Try to unlock submission; a wrong attempt locks it again
    pub fn unlock(&self, attempt: Option<&str>) -> bool {
        let unlocked = self.access.unlock(attempt);
        self.unlocked.store(unlocked, Ordering::SeqCst);
        if !unlocked {
            warn!("Translation is locked. Enter the passphrase to unlock.");
        }
        unlocked
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Submit a document for translation and run the job to its end
    ///
    /// Returns `Err` only when no job was started: locked controls, a job
    /// already running, no or unsupported document, or missing credentials.
    /// A job that starts and then fails is reported through the returned
    /// snapshot with `JobState::Failed`.
    ///
    /// Dropping the returned future before it resolves fails the job with
    /// `ABANDONED_STATUS`, so the controller accepts new submissions again.
    pub async fn submit(&self, upload: Option<Upload>, config: JobConfig) -> Result<JobSnapshot, SubmitError> {
        let (job, credentials) = self.start_job(upload, config)?;
        let _abandon = AbandonGuard(&job);
        self.run(&job, &credentials).await;
        Ok(job.snapshot())
    }

    /// Checks and job installation happen under one lock so two
    /// submissions can never both start.
    fn start_job(&self, upload: Option<Upload>, config: JobConfig) -> Result<(Arc<Job>, EngineCredentials), SubmitError> {
        if !self.is_unlocked() {
            return Err(SubmitError::Locked);
        }

        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|job| job.state() == JobState::Running) {
            return Err(SubmitError::JobInProgress);
        }

        let upload = upload.ok_or(SubmitError::MissingDocument)?;
        if !FileManager::is_pdf_file_name(&upload.file_name) {
            return Err(SubmitError::InvalidDocument(format!("{} is not a PDF file", upload.file_name)));
        }

        let credentials = self.credentials.load();
        gate::validate(&credentials).inspect_err(|e| {
            warn!("Configuration Error: {}", e);
        })?;

        let document = self.documents.ingest(&upload)?;
        if document.is_empty() {
            return Err(SubmitError::InvalidDocument(format!("{} is empty", document.file_name)));
        }

        let job = Arc::new(Job::new(document, config));
        if let Err(e) = job.start(Phase::Starting.status()) {
            error!("Job {}: {}", job.short_id(), e);
        }
        self.artifacts.clear();
        *current = Some(Arc::clone(&job));

        info!(
            "Job {} started for {} ({} bytes)",
            job.short_id(),
            job.document().file_name,
            job.document().len()
        );
        Ok((job, credentials))
    }

    async fn run(&self, job: &Arc<Job>, credentials: &EngineCredentials) {
        let started = Instant::now();
        let progress = Arc::clone(job.progress());

        progress.enter(Phase::ReadingDocument);
        progress.enter(Phase::InitializingEngine);

        progress.enter(Phase::ResolvingFonts);
        let fonts = self.resources.resolve(&job.config().target_language).await;
        if let Some(note) = &fonts.note {
            info!("{}", note);
            progress.set_status(note.clone());
        }

        progress.enter(Phase::Translating);
        let reporter = PhaseReporter::new(Arc::clone(&progress), Phase::Translating);
        let outcome = self
            .adapter
            .invoke(
                Arc::clone(job.document()),
                job.config(),
                credentials,
                fonts.resource,
                reporter,
            )
            .await;

        match outcome {
            Ok(artifacts) => {
                let result = TranslationResult::new(job.id(), job.document().base_name(), artifacts);
                self.artifacts.store(result);
                if let Err(e) = job.succeed(Phase::Complete.status()) {
                    error!("Job {}: {}", job.short_id(), e);
                }
                info!(
                    "Job {} completed in {}",
                    job.short_id(),
                    format_duration(started.elapsed())
                );
            }
            Err(e) => {
                if let Err(transition) = job.fail(format!("Error: {}", e)) {
                    error!("Job {}: {}", job.short_id(), transition);
                }
                error!("Translation failed: {}", e);
            }
        }
    }

    /// Current job state for display; `Idle` before the first submission
    pub fn snapshot(&self) -> JobSnapshot {
        self.current
            .lock()
            .as_ref()
            .map(|job| job.snapshot())
            .unwrap_or_else(JobSnapshot::idle)
    }

    pub fn state(&self) -> JobState {
        self.snapshot().state
    }

    pub fn current_job(&self) -> Option<Arc<Job>> {
        self.current.lock().clone()
    }

    /// Result of the current job, only once it has completed
    pub fn result(&self) -> Option<Arc<TranslationResult>> {
        let job = self.current_job()?;
        if job.state() != JobState::Completed {
            return None;
        }
        self.artifacts
            .current()
            .filter(|result| result.job_id == job.id())
    }

    /// The cached upload, for showing next to the translation
    pub fn original(&self) -> Option<Arc<SourceDocument>> {
        self.documents.current()
    }

    pub fn engine_name(&self) -> &str {
        self.adapter.engine_name()
    }
}

/// Format a duration as `1h 2m 3s`, `2m 3s` or `3.4s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
