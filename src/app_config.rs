/*!
 * Application configuration: loading, validating and saving settings.
 *
 * Engine credentials are not stored here; they are read from the
 * environment on every submission.
 */

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fmt;
use std::path::PathBuf;

use crate::access::AccessGate;
use crate::language_utils::{self, DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE};

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default source language tag
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Default target language tag
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Default engine worker-thread hint
    #[serde(default = "default_threads")]
    pub threads: u8,

    /// Skip font subsetting in the produced documents
    #[serde(default)]
    pub skip_font_subsetting: bool,

    /// Ask the engine to bypass its translation cache
    #[serde(default)]
    pub ignore_cache: bool,

    /// Translation engine service
    #[serde(default)]
    pub engine: EngineConfig,

    /// Font resolution
    #[serde(default)]
    pub fonts: FontConfig,

    /// Layout-detection model
    #[serde(default)]
    pub model: ModelConfig,

    /// Passphrase that unlocks submission (open when unset)
    #[serde(default)]
    pub passphrase: Option<String>,

    /// Directory where translated documents are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation engine service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    // @field: Engine task service URL
    #[serde(default = "default_engine_endpoint")]
    pub endpoint: String,

    // @field: Translation backend the engine should use
    #[serde(default = "default_engine_service")]
    pub service: String,

    // @field: Delay between task status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    // @field: Per-request timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_engine_endpoint(),
            service: default_engine_service(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Font resolution configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FontConfig {
    /// Download fonts for the target language before translating
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL that font file names are appended to
    #[serde(default = "default_font_base_url")]
    pub base_url: String,

    /// Font cache directory (defaults to the user cache dir)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Download timeout in seconds
    #[serde(default = "default_font_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_font_base_url(),
            cache_dir: None,
            timeout_secs: default_font_timeout_secs(),
        }
    }
}

/// Layout-detection model configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    /// Explicit model file; when unset the cache dir is used
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Where to fetch the model when it is not cached yet
    #[serde(default = "default_model_url")]
    pub download_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            download_url: default_model_url(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

pub const MIN_THREADS: u8 = 1;
pub const MAX_THREADS: u8 = 8;

fn default_source_language() -> String {
    DEFAULT_SOURCE_LANGUAGE.to_string()
}

fn default_target_language() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

fn default_threads() -> u8 {
    4
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_engine_endpoint() -> String {
    "http://localhost:11008".to_string()
}

fn default_engine_service() -> String {
    "azure-openai".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_font_timeout_secs() -> u64 {
    30
}

fn default_font_base_url() -> String {
    "https://huggingface.co/datasets/Byaidu/PDFMathTranslate/resolve/main/fonts".to_string()
}

fn default_model_url() -> String {
    "https://huggingface.co/wybxc/DocLayout-YOLO-DocStructBench-onnx/resolve/main/doclayout_yolo_docstructbench_imgsz1024.onnx".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        language_utils::validate_language_tag(&self.source_language)?;
        language_utils::validate_language_tag(&self.target_language)?;

        if !(MIN_THREADS..=MAX_THREADS).contains(&self.threads) {
            return Err(anyhow!(
                "Thread count must be between {} and {}, got {}",
                MIN_THREADS, MAX_THREADS, self.threads
            ));
        }

        url::Url::parse(&self.engine.endpoint)
            .map_err(|e| anyhow!("Invalid engine endpoint '{}': {}", self.engine.endpoint, e))?;

        if self.fonts.enabled {
            url::Url::parse(&self.fonts.base_url)
                .map_err(|e| anyhow!("Invalid font base URL '{}': {}", self.fonts.base_url, e))?;
        }

        if self.engine.poll_interval_ms == 0 {
            return Err(anyhow!("Engine poll interval must be greater than zero"));
        }

        Ok(())
    }

    /// Gate built from the configured passphrase, open when none is set
    pub fn access_gate(&self) -> AccessGate {
        AccessGate::new(self.passphrase.as_deref())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            threads: default_threads(),
            skip_font_subsetting: false,
            ignore_cache: false,
            engine: EngineConfig::default(),
            fonts: FontConfig::default(),
            model: ModelConfig::default(),
            passphrase: None,
            output_dir: default_output_dir(),
            log_level: LogLevel::default(),
        }
    }
}

pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_BASE_URL";
pub const ENV_ENDPOINT_FALLBACK: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";
const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Credentials for the engine's language model backend
#[derive(Clone, Default, PartialEq)]
pub struct EngineCredentials {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

// Never print the key.
impl fmt::Debug for EngineCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" })
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl EngineCredentials {
    /// Build credentials from a variable lookup
    ///
    /// Values have surrounding quotes removed and the endpoint loses any
    /// trailing slash. Deployment and API version fall back to defaults
    /// when the variable is absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| strip_quotes(&v));

        let endpoint = read(ENV_ENDPOINT)
            .or_else(|| read(ENV_ENDPOINT_FALLBACK))
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        Self {
            endpoint,
            api_key: read(ENV_API_KEY).unwrap_or_default(),
            deployment: read(ENV_DEPLOYMENT).unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            api_version: read(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        }
    }

    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Something that yields the current engine credentials
///
/// The job controller asks again on every submission so that a changed
/// environment is picked up without a restart.
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> EngineCredentials;
}

/// Reads credentials from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn load(&self) -> EngineCredentials {
        EngineCredentials::from_env()
    }
}

impl CredentialSource for EngineCredentials {
    fn load(&self) -> EngineCredentials {
        self.clone()
    }
}

/// Remove one pair of matching surrounding quotes
fn strip_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
