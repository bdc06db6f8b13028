/*!
 * Translation job orchestration.
 *
 * - `gate`: credential checks that must pass before a job starts
 * - `progress`: phase-based, monotonic progress aggregation
 * - `job`: job model and lifecycle transitions
 * - `store`: upload cache and translated artifact store
 * - `controller`: the job state machine tying the pieces together
 */

pub use self::controller::{ABANDONED_STATUS, JobController};
pub use self::job::{CachePolicy, Job, JobConfig, JobSnapshot, JobState, SourceDocument};
pub use self::progress::{Phase, PhaseReporter, ProgressTracker};
pub use self::store::{ArtifactKind, ArtifactStore, DocumentCache, TranslatedArtifacts, TranslationResult, Upload};

pub mod controller;
pub mod gate;
pub mod job;
pub mod progress;
pub mod store;
