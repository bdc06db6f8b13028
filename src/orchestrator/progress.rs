/*!
 * Progress aggregation for translation jobs.
 *
 * A job exposes one progress value in [0, 1]. The pipeline moves through
 * fixed phases, each owning a slice of that range; the engine's own
 * `(completed, total)` events are mapped into the slice of the translating
 * phase. Engine workers report concurrently, so every write goes through
 * `ProgressTracker::apply_if_newer`, which never lets the value go down.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

/// Pipeline phases and their share of the progress scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    ReadingDocument,
    InitializingEngine,
    ResolvingFonts,
    Translating,
    Complete,
}

impl Phase {
    /// Progress value at which the phase starts
    pub fn base(&self) -> f64 {
        match self {
            Self::Starting => 0.0,
            Self::ReadingDocument => 0.1,
            Self::InitializingEngine => 0.2,
            Self::ResolvingFonts => 0.3,
            Self::Translating => 0.4,
            Self::Complete => 1.0,
        }
    }

    /// Width of the slice the phase can fill
    pub fn span(&self) -> f64 {
        match self {
            Self::Translating => 0.5,
            _ => 0.0,
        }
    }

    /// Highest value the phase may report before the next phase begins
    pub fn ceiling(&self) -> f64 {
        self.base() + self.span()
    }

    /// Status text shown when the phase is entered
    pub fn status(&self) -> &'static str {
        match self {
            Self::Starting => "Starting translation...",
            Self::ReadingDocument => "Reading PDF file...",
            Self::InitializingEngine => "Initializing translator...",
            Self::ResolvingFonts => "Downloading fonts...",
            Self::Translating => "Translating PDF (this may take a while)...",
            Self::Complete => "Translation complete!",
        }
    }
}

/// Status used when the engine reports progress without a label
pub const DEFAULT_TRANSLATING_LABEL: &str = "Translating pages...";

/// Engine progress entries kept in a job's history; the oldest go first
pub const ENGINE_HISTORY_LIMIT: usize = 256;

/// Who made an update: phase entries, notes and terminal statuses are
/// always kept, engine events only up to `ENGINE_HISTORY_LIMIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Pipeline,
    Engine,
}

#[derive(Debug)]
struct ProgressState {
    value: f64,
    status: String,
    frozen: bool,
    history: VecDeque<(Origin, ProgressUpdate)>,
    engine_entries: usize,
}

/// One applied progress/status change
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub value: f64,
    pub status: String,
}

impl ProgressState {
    fn record(&mut self, origin: Origin) {
        if origin == Origin::Engine {
            if self.engine_entries >= ENGINE_HISTORY_LIMIT {
                if let Some(oldest) = self.history.iter().position(|(o, _)| *o == Origin::Engine) {
                    self.history.remove(oldest);
                    self.engine_entries -= 1;
                }
            }
            self.engine_entries += 1;
        }
        let update = ProgressUpdate {
            value: self.value,
            status: self.status.clone(),
        };
        self.history.push_back((origin, update));
    }
}

/// Monotonic progress and status for a single job
#[derive(Debug)]
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProgressState {
                value: 0.0,
                status: String::new(),
                frozen: false,
                history: VecDeque::new(),
                engine_entries: 0,
            }),
        }
    }

    /// Apply a progress value and status if the value is not lower than the current one
    ///
    /// Returns whether the update was applied. Updates after the tracker
    /// was frozen or pinned are dropped.
    pub fn apply_if_newer(&self, value: f64, status: impl Into<String>) -> bool {
        self.apply(value, status.into(), Origin::Pipeline)
    }

    /// Enter a phase: its base value and status text
    pub fn enter(&self, phase: Phase) -> bool {
        self.apply_if_newer(phase.base(), phase.status())
    }

    fn apply(&self, value: f64, status: String, origin: Origin) -> bool {
        let value = value.clamp(0.0, 1.0);
        let mut state = self.state.lock();
        if state.frozen || value < state.value {
            return false;
        }
        state.value = value;
        state.status = status;
        state.record(origin);
        true
    }

    /// Replace the status text without touching the value
    pub fn set_status(&self, status: impl Into<String>) {
        let mut state = self.state.lock();
        if !state.frozen {
            state.status = status.into();
            state.record(Origin::Pipeline);
        }
    }

    /// Pin progress at 1.0 and stop accepting updates
    pub fn complete(&self, status: impl Into<String>) {
        let mut state = self.state.lock();
        state.value = 1.0;
        state.status = status.into();
        state.frozen = true;
        state.record(Origin::Pipeline);
    }

    /// Keep the current value, set the final status, stop accepting updates
    pub fn freeze(&self, status: impl Into<String>) {
        let mut state = self.state.lock();
        state.status = status.into();
        state.frozen = true;
        state.record(Origin::Pipeline);
    }

    pub fn value(&self) -> f64 {
        self.state.lock().value
    }

    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }

    /// Value and status read under one lock
    pub fn snapshot(&self) -> (f64, String) {
        let state = self.state.lock();
        (state.value, state.status.clone())
    }

    /// Applied updates, oldest first
    ///
    /// Holds every pipeline update and the latest `ENGINE_HISTORY_LIMIT`
    /// engine events.
    pub fn history(&self) -> Vec<ProgressUpdate> {
        self.state
            .lock()
            .history
            .iter()
            .map(|(_, update)| update.clone())
            .collect()
    }
}

/// Maps engine progress events onto a phase of a job's tracker
#[derive(Debug, Clone)]
pub struct PhaseReporter {
    tracker: Arc<ProgressTracker>,
    phase: Phase,
}

impl PhaseReporter {
    pub fn new(tracker: Arc<ProgressTracker>, phase: Phase) -> Self {
        Self { tracker, phase }
    }

    /// Visible progress for `completed / total` within this phase
    ///
    /// `None` when `total` is zero, i.e. the engine does not know the
    /// amount of work yet.
    pub fn map_fraction(&self, completed: u64, total: u64) -> Option<f64> {
        if total == 0 {
            return None;
        }
        let fraction = (completed as f64 / total as f64).clamp(0.0, 1.0);
        let value = self.phase.base() + fraction * self.phase.span();
        Some(value.min(self.phase.ceiling()))
    }

    /// Report engine progress; returns whether the visible value was updated
    pub fn report(&self, completed: u64, total: u64, label: Option<&str>) -> bool {
        let Some(value) = self.map_fraction(completed, total) else {
            debug!("Ignoring progress event with unknown total ({} done)", completed);
            return false;
        };

        let status = match label {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ => DEFAULT_TRANSLATING_LABEL.to_string(),
        };

        self.tracker.apply(value, status, Origin::Engine)
    }
}
