/*!
 * Error types for the pdftrans application.
 *
 * Each stage of a translation job has its own error type so that the job
 * state machine can decide which failures are fatal and which are absorbed:
 * - `ConfigError`: missing credentials or invalid job options, job never starts
 * - `AuxiliaryResourceError`: font resolution problems, never fatal
 * - `TranslationError`: engine failures, terminal for the job
 * - `ModelLoadError`: layout model initialization, fatal for the process
 */

use std::path::PathBuf;

use thiserror::Error;

use crate::orchestrator::job::JobState;

/// A required credential field checked by the configuration gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Endpoint,
    ApiKey,
    Deployment,
    ApiVersion,
}

impl CredentialField {
    /// Human readable field label used in gate messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Endpoint => "Azure Endpoint",
            Self::ApiKey => "API Key",
            Self::Deployment => "Deployment Name",
            Self::ApiVersion => "API Version",
        }
    }
}

/// Errors raised before a job is allowed to start
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required credential is empty
    #[error("{} is required", .0.label())]
    MissingField(CredentialField),

    /// A job option is out of range or malformed
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Errors that can occur when talking to an HTTP service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Font resolution failures; the job continues with engine defaults
#[derive(Error, Debug)]
pub enum AuxiliaryResourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("font not available: {0}")]
    NotFound(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("font cache error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for AuxiliaryResourceError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::ApiError { status_code: 404, message } => Self::NotFound(message),
            other => Self::Network(other.to_string()),
        }
    }
}

/// Errors that can occur during the engine call
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The engine returned without one of the two artifacts
    #[error("translation engine returned no {0} document")]
    MissingArtifact(&'static str),

    /// Error from the engine's transport
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

/// Layout model initialization failures
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("layout model not found at {0}")]
    NotFound(PathBuf),

    #[error("layout model at {0} is empty")]
    Empty(PathBuf),

    #[error("failed to read layout model: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to download layout model: {0}")]
    Download(String),
}

/// Reasons a submission did not start a job
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("a translation job is already running")]
    JobInProgress,

    #[error("Please upload a PDF file first.")]
    MissingDocument,

    #[error("Unsupported document: {0}")]
    InvalidDocument(String),

    #[error("Submission is locked. Enter the passphrase to unlock translation.")]
    Locked,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// An illegal job state transition
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid job transition from {from} to {to}")]
pub struct JobStateError {
    pub from: JobState,
    pub to: JobState,
}
