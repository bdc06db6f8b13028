/*!
 * Boundary to the external layout-preserving translation engine.
 *
 * The engine parses the PDF, translates its text with a language model and
 * writes two documents back: the translation alone and a bilingual
 * side-by-side version. This module only defines the contract and the
 * clients for it:
 * - `adapter`: the single call site used by the job state machine
 * - `remote`: HTTP client for an engine task service
 * - `mock`: deterministic engine for tests and offline runs
 * - `model`: the process-wide layout-detection model capability
 */

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::ProviderError;
use crate::fonts::FontResource;
use crate::orchestrator::job::{CachePolicy, SourceDocument};

pub use self::adapter::TranslationAdapter;
pub use self::model::LayoutModel;

pub mod adapter;
pub mod mock;
pub mod model;
pub mod remote;

/// One progress event emitted by the engine's workers
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProgress {
    pub completed: u64,
    pub total: u64,
    pub label: Option<String>,
}

impl EngineProgress {
    pub fn new(completed: u64, total: u64, label: Option<String>) -> Self {
        Self { completed, total, label }
    }
}

/// Callback the engine invokes, possibly from several threads at once
pub type ProgressCallback = Arc<dyn Fn(EngineProgress) + Send + Sync>;

/// Environment handed to the engine's language model backend
///
/// Holds secrets, so `Debug` prints keys only.
#[derive(Clone, Default, PartialEq)]
pub struct EngineEnv(BTreeMap<String, String>);

impl EngineEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl fmt::Debug for EngineEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Everything the engine needs for one translation
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub document: Arc<SourceDocument>,
    pub source_language: String,
    pub target_language: String,
    /// Worker-thread hint for the engine's own parallelism
    pub concurrency: u8,
    pub env: EngineEnv,
    pub skip_font_subsetting: bool,
    pub cache_policy: CachePolicy,
    /// Target-language font, `None` means engine defaults
    pub font: Option<FontResource>,
    pub model: Arc<LayoutModel>,
}

/// Raw engine output; the adapter enforces that both documents are present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub monolingual: Option<Bytes>,
    pub bilingual: Option<Bytes>,
}

/// Common trait for translation engines
#[async_trait]
pub trait TranslationEngine: Send + Sync + fmt::Debug {
    /// Short engine name for logs
    fn name(&self) -> &str;

    /// Translate a document, reporting progress through `progress`
    async fn translate(
        &self,
        request: EngineRequest,
        progress: ProgressCallback,
    ) -> Result<EngineOutput, ProviderError>;
}
