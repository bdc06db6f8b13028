/*!
 * # pdftrans - layout-preserving PDF translation jobs
 *
 * A Rust library for submitting PDF documents to an external
 * layout-preserving translation engine and following the job to its end.
 *
 * ## Features
 *
 * - One translation job at a time, with a single monotonic progress value
 * - Credential checks before any job starts
 * - Best-effort download of target-language fonts
 * - Monolingual and bilingual output documents, saved as
 *   `{name}-mono.pdf` and `{name}-dual.pdf`
 * - Remote engine task service client and a mock engine for offline runs
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration and engine credentials
 * - `orchestrator`: Job state machine, progress aggregation, stores
 * - `engine`: Engine contract, invocation adapter, remote/mock engines,
 *   layout model handle
 * - `fonts`: Target-language font resolution
 * - `access`: Shared passphrase gate
 * - `file_utils`: File system operations
 * - `language_utils`: Language list and tag utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod access;
pub mod app_config;
pub mod engine;
pub mod errors;
pub mod file_utils;
pub mod fonts;
pub mod language_utils;
pub mod orchestrator;

// Re-export main types for easier usage
pub use app_config::{Config, EngineCredentials};
pub use engine::{LayoutModel, TranslationAdapter, TranslationEngine};
pub use errors::{AuxiliaryResourceError, ConfigError, ModelLoadError, SubmitError, TranslationError};
pub use orchestrator::{JobConfig, JobController, JobSnapshot, JobState, TranslationResult, Upload};
