/*!
 * HTTP client for a remote translation engine task service.
 *
 * The service runs the layout-preserving engine as background tasks:
 * - `POST /v1/translate` with a multipart `file` and JSON `data` creates a task
 * - `GET /v1/translate/{id}` reports `PENDING | STARTED | PROGRESS | SUCCESS | FAILURE`
 *   and, while in progress, `info.n` / `info.total` / `info.desc`
 * - `GET /v1/translate/{id}/mono` and `/dual` return the finished documents
 */

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::app_config::EngineConfig;
use crate::engine::{EngineOutput, EngineProgress, EngineRequest, ProgressCallback, TranslationEngine};
use crate::errors::ProviderError;

/// Task state reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Started,
    Progress,
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

/// Progress details attached to a task status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub n: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of the task status endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default)]
    pub info: Option<TaskInfo>,
}

impl TaskStatus {
    /// Progress event carried by this status, if any
    pub fn progress(&self) -> Option<EngineProgress> {
        let info = self.info.as_ref()?;
        let (completed, total) = (info.n?, info.total?);
        Some(EngineProgress::new(completed, total, info.desc.clone()))
    }

    pub fn failure_message(&self) -> String {
        self.info
            .as_ref()
            .and_then(|i| i.error.clone())
            .unwrap_or_else(|| "translation task failed".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedTask {
    id: String,
}

/// Remote engine client
#[derive(Debug)]
pub struct RemoteEngine {
    client: Client,
    base_url: Url,
    service: String,
    poll_interval: Duration,
}

impl RemoteEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(&config.endpoint)
            .map_err(|e| ProviderError::RequestFailed(format!("invalid engine endpoint: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            service: config.service.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// URL of a task endpoint, `suffix` being empty, `mono` or `dual`
    pub fn task_url(&self, task_id: &str, suffix: &str) -> Result<Url, ProviderError> {
        let path = if suffix.is_empty() {
            format!("v1/translate/{}", task_id)
        } else {
            format!("v1/translate/{}/{}", task_id, suffix)
        };
        self.base_url
            .join(&path)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }

    /// The JSON `data` part of the task creation request
    pub fn task_data(&self, request: &EngineRequest) -> Value {
        json!({
            "lang_in": request.source_language,
            "lang_out": request.target_language,
            "service": self.service,
            "thread": request.concurrency,
            "envs": request.env.as_map(),
            "skip_subset_fonts": request.skip_font_subsetting,
            "ignore_cache": request.cache_policy.ignores_cache(),
            "font": request.font.as_ref().map(|f| f.file_name.clone()),
            "model": request.model.name(),
        })
    }

    async fn create_task(&self, request: &EngineRequest) -> Result<String, ProviderError> {
        let url = self
            .base_url
            .join("v1/translate")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let file = Part::bytes(request.document.bytes.to_vec())
            .file_name(request.document.file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new()
            .part("file", file)
            .text("data", self.task_data(request).to_string());

        let response = check_status(self.client.post(url).multipart(form).send().await?).await?;
        let created: CreatedTask = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        debug!("Engine task {} created", created.id);
        Ok(created.id)
    }

    async fn poll(&self, task_id: &str) -> Result<TaskStatus, ProviderError> {
        let response = check_status(self.client.get(self.task_url(task_id, "")?).send().await?).await?;
        let body = response.text().await?;
        parse_task_status(&body)
    }

    async fn fetch_document(&self, task_id: &str, suffix: &str) -> Result<Bytes, ProviderError> {
        let response = check_status(self.client.get(self.task_url(task_id, suffix)?).send().await?).await?;
        Ok(response.bytes().await?)
    }
}

/// Parse a task status body
pub fn parse_task_status(body: &str) -> Result<TaskStatus, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::ParseError(format!("{}: {}", e, body)))
}

async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::AuthenticationError(message)),
        _ => Err(ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        }),
    }
}

#[async_trait]
impl TranslationEngine for RemoteEngine {
    fn name(&self) -> &str {
        "remote"
    }

    async fn translate(
        &self,
        request: EngineRequest,
        progress: ProgressCallback,
    ) -> Result<EngineOutput, ProviderError> {
        let task_id = self.create_task(&request).await?;

        loop {
            let status = self.poll(&task_id).await?;
            match status.state {
                TaskState::Success => break,
                TaskState::Failure => {
                    return Err(ProviderError::ApiError {
                        status_code: 500,
                        message: status.failure_message(),
                    });
                }
                TaskState::Progress => {
                    if let Some(event) = status.progress() {
                        progress(event);
                    }
                }
                TaskState::Pending | TaskState::Started => {}
                TaskState::Unknown => warn!("Engine task {} reported an unknown state", task_id),
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let monolingual = self.fetch_document(&task_id, "mono").await?;
        let bilingual = self.fetch_document(&task_id, "dual").await?;

        Ok(EngineOutput {
            monolingual: Some(monolingual),
            bilingual: Some(bilingual),
        })
    }
}
