/*!
 * Layout-detection model handle.
 *
 * The model is loaded once at process start. Jobs never reload it; a load
 * failure stops the process before any job can be submitted. The handle is
 * passed to the adapter explicitly so tests can use an in-memory model.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use reqwest::Client;

use crate::app_config::ModelConfig;
use crate::errors::ModelLoadError;
use crate::file_utils::FileManager;

const DEFAULT_MODEL_FILE: &str = "doclayout_yolo_docstructbench_imgsz1024.onnx";

/// A loaded layout-detection model
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutModel {
    name: String,
    path: Option<PathBuf>,
    fingerprint: String,
    size: usize,
}

impl LayoutModel {
    /// Load a model file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(ModelLoadError::Empty(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string());

        let model = Self {
            name,
            path: Some(path.to_path_buf()),
            fingerprint: FileManager::sha256_hex(&bytes),
            size: bytes.len(),
        };
        info!("Loaded layout model {} ({} bytes, {})", model.name, model.size, model.short_fingerprint());
        Ok(model)
    }

    /// Build a model from bytes already in memory
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(ModelLoadError::Empty(PathBuf::from(&name)));
        }
        Ok(Self {
            name,
            path: None,
            fingerprint: FileManager::sha256_hex(bytes),
            size: bytes.len(),
        })
    }

    /// Load the configured model, downloading it into the cache on first use
    pub async fn load_available(config: &ModelConfig) -> Result<Self, ModelLoadError> {
        let path = match &config.path {
            Some(path) => return Self::load(path),
            None => FileManager::cache_dir("models").join(DEFAULT_MODEL_FILE),
        };

        if !path.is_file() {
            info!("Layout model not cached, downloading from {}", config.download_url);
            download(&config.download_url, &path).await?;
        } else {
            debug!("Using cached layout model {:?}", path);
        }

        Self::load(&path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..12]
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

async fn download(url: &str, destination: &Path) -> Result<(), ModelLoadError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(600))
        .build()
        .map_err(|e| ModelLoadError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ModelLoadError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ModelLoadError::Download(format!("HTTP {} from {}", response.status(), url)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ModelLoadError::Download(e.to_string()))?;

    FileManager::write_atomic(destination, &bytes)
        .map_err(|e| ModelLoadError::Download(e.to_string()))?;
    Ok(())
}
