/*!
 * Target-language font resolution.
 *
 * Fonts are a best-effort input to the engine: when no font can be
 * obtained the engine falls back to its bundled defaults. `FontResolver`
 * implementations may fail; `ResourceResolver` turns every failure into a
 * status note and never lets it reach the job.
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;

use crate::app_config::FontConfig;
use crate::errors::{AuxiliaryResourceError, ProviderError};
use crate::file_utils::FileManager;
use crate::language_utils;

const DEFAULT_FONT: &str = "GoNotoKurrent-Regular.ttf";

/// Font file used for a target language
pub fn font_file_for_language(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-hans" => "SourceHanSerifCN-Regular.ttf",
        "zh-tw" | "zh-hk" | "zh-hant" => "SourceHanSerifTW-Regular.ttf",
        "ja" => "SourceHanSerifJP-Regular.ttf",
        "ko" => "SourceHanSerifKR-Regular.ttf",
        _ => DEFAULT_FONT,
    }
}

/// A font file available on local disk
#[derive(Debug, Clone, PartialEq)]
pub struct FontResource {
    pub language: String,
    pub file_name: String,
    pub path: PathBuf,
}

/// Fetches a font for a target language
#[async_trait]
pub trait FontResolver: Send + Sync {
    /// `Ok(None)` means the service has nothing for this language
    async fn fetch_fonts(&self, target_language: &str) -> Result<Option<FontResource>, AuxiliaryResourceError>;
}

/// Downloads font files over HTTP into a local cache directory
pub struct RemoteFontResolver {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl RemoteFontResolver {
    pub fn new(config: &FontConfig) -> Result<Self, AuxiliaryResourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuxiliaryResourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache_dir: config
                .cache_dir
                .clone()
                .unwrap_or_else(|| FileManager::cache_dir("fonts")),
        })
    }

    fn font_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url, file_name)
    }

    async fn download(&self, file_name: &str) -> Result<bytes::Bytes, ProviderError> {
        let url = self.font_url(file_name);
        debug!("Downloading font from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: format!("{} returned {}", url, status),
            });
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl FontResolver for RemoteFontResolver {
    async fn fetch_fonts(&self, target_language: &str) -> Result<Option<FontResource>, AuxiliaryResourceError> {
        let primary = language_utils::primary_subtag(target_language);
        if primary.is_empty() {
            return Err(AuxiliaryResourceError::UnsupportedLanguage(target_language.to_string()));
        }

        let file_name = font_file_for_language(target_language);
        let path = self.cache_dir.join(file_name);

        if !FileManager::file_exists(&path) {
            let bytes = self.download(file_name).await?;
            if bytes.is_empty() {
                return Err(AuxiliaryResourceError::NotFound(file_name.to_string()));
            }
            FileManager::write_atomic(&path, &bytes)
                .map_err(|e| AuxiliaryResourceError::Io(std::io::Error::other(e.to_string())))?;
            info!("Cached font {} ({} bytes)", file_name, bytes.len());
        }

        Ok(Some(FontResource {
            language: target_language.to_string(),
            file_name: file_name.to_string(),
            path,
        }))
    }
}

/// Resolver used when font download is turned off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFontResolver;

#[async_trait]
impl FontResolver for NoFontResolver {
    async fn fetch_fonts(&self, _target_language: &str) -> Result<Option<FontResource>, AuxiliaryResourceError> {
        Ok(None)
    }
}

/// What font resolution produced for a job
#[derive(Debug, Clone, PartialEq)]
pub struct FontOutcome {
    pub resource: Option<FontResource>,
    /// Status text to show when the engine defaults are used
    pub note: Option<String>,
}

/// Best-effort wrapper: any failure becomes a note and `None`
#[derive(Clone)]
pub struct ResourceResolver {
    inner: Arc<dyn FontResolver>,
}

impl ResourceResolver {
    pub fn new(inner: Arc<dyn FontResolver>) -> Self {
        Self { inner }
    }

    pub async fn resolve(&self, target_language: &str) -> FontOutcome {
        match self.inner.fetch_fonts(&target_language.to_lowercase()).await {
            Ok(Some(resource)) => {
                debug!("Using font {} for {}", resource.file_name, target_language);
                FontOutcome { resource: Some(resource), note: None }
            }
            Ok(None) => FontOutcome {
                resource: None,
                note: Some("Using default fonts for translation.".to_string()),
            },
            Err(e) => {
                info!("Font resolution for {} failed: {}", target_language, e);
                FontOutcome {
                    resource: None,
                    note: Some(format!(
                        "Font download note: {}. Using default fonts - translation will continue.",
                        e
                    )),
                }
            }
        }
    }
}
