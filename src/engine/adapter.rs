/*!
 * Translation invocation adapter: the only code that calls the engine.
 */

use std::sync::Arc;

use log::{debug, error, info};

use crate::app_config::EngineCredentials;
use crate::engine::{
    EngineEnv, EngineOutput, EngineProgress, EngineRequest, LayoutModel, ProgressCallback,
    TranslationEngine,
};
use crate::errors::TranslationError;
use crate::fonts::FontResource;
use crate::language_utils;
use crate::orchestrator::job::{JobConfig, SourceDocument};
use crate::orchestrator::progress::PhaseReporter;
use crate::orchestrator::store::TranslatedArtifacts;

pub const ENGINE_ENV_BASE_URL: &str = "AZURE_OPENAI_BASE_URL";
pub const ENGINE_ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENGINE_ENV_MODEL: &str = "AZURE_OPENAI_MODEL";
pub const ENGINE_ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

/// Builds engine requests and unpacks engine results
#[derive(Debug, Clone)]
pub struct TranslationAdapter {
    engine: Arc<dyn TranslationEngine>,
    model: Arc<LayoutModel>,
}

impl TranslationAdapter {
    pub fn new(engine: Arc<dyn TranslationEngine>, model: Arc<LayoutModel>) -> Self {
        Self { engine, model }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Credential bundle in the shape the engine expects
    pub fn engine_env(credentials: &EngineCredentials) -> EngineEnv {
        let mut env = EngineEnv::new();
        env.insert(ENGINE_ENV_BASE_URL, credentials.endpoint.clone());
        env.insert(ENGINE_ENV_API_KEY, credentials.api_key.clone());
        env.insert(ENGINE_ENV_MODEL, credentials.deployment.clone());
        env.insert(ENGINE_ENV_API_VERSION, credentials.api_version.clone());
        env
    }

    /// Assemble the engine request for one job
    pub fn build_request(
        &self,
        document: Arc<SourceDocument>,
        config: &JobConfig,
        credentials: &EngineCredentials,
        font: Option<FontResource>,
    ) -> EngineRequest {
        EngineRequest {
            document,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            concurrency: config.threads,
            env: Self::engine_env(credentials),
            skip_font_subsetting: config.skip_font_subsetting,
            cache_policy: config.cache_policy,
            font,
            model: Arc::clone(&self.model),
        }
    }

    /// Translate a document; both artifacts or an error
    pub async fn invoke(
        &self,
        document: Arc<SourceDocument>,
        config: &JobConfig,
        credentials: &EngineCredentials,
        font: Option<FontResource>,
        progress: PhaseReporter,
    ) -> Result<TranslatedArtifacts, TranslationError> {
        let request = self.build_request(document, config, credentials, font);

        info!(
            "{}: {} -> {} with {} thread(s), model {}",
            self.engine.name(),
            language_utils::get_language_name(&request.source_language),
            language_utils::get_language_name(&request.target_language),
            request.concurrency,
            self.model.name()
        );
        debug!("Engine env keys: {:?}", request.env);

        let callback: ProgressCallback = Arc::new(move |event: EngineProgress| {
            progress.report(event.completed, event.total, event.label.as_deref());
        });

        let output = self.engine.translate(request, callback).await.map_err(|e| {
            error!("Translation engine failed: {}", e);
            TranslationError::from(e)
        })?;

        unpack(output)
    }
}

/// Both documents must be present and non-empty
fn unpack(output: EngineOutput) -> Result<TranslatedArtifacts, TranslationError> {
    let monolingual = output
        .monolingual
        .filter(|b| !b.is_empty())
        .ok_or(TranslationError::MissingArtifact("monolingual"))?;
    let bilingual = output
        .bilingual
        .filter(|b| !b.is_empty())
        .ok_or(TranslationError::MissingArtifact("bilingual"))?;

    Ok(TranslatedArtifacts { monolingual, bilingual })
}
