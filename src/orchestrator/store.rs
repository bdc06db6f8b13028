/*!
 * Source document cache and translated artifact store.
 *
 * Both hold at most one entry: the latest upload and the result of the
 * latest completed job. A new entry simply replaces the previous one.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use bytes::Bytes;
use log::{debug, info};
use parking_lot::RwLock;

use crate::file_utils::FileManager;
use crate::orchestrator::job::SourceDocument;

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Read from disk when the upload is ingested
    Path(PathBuf),
    /// Already in memory
    Bytes(Bytes),
}

/// An uploaded file: its name and a way to get its bytes
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub source: UploadSource,
}

impl Upload {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            file_name,
            source: UploadSource::Path(path.to_path_buf()),
        }
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            source: UploadSource::Bytes(bytes.into()),
        }
    }

    fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            UploadSource::Path(path) => std::fs::read(path).map(Bytes::from),
            UploadSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Caches the bytes of the most recent upload, keyed by file name
#[derive(Debug, Default)]
pub struct DocumentCache {
    current: RwLock<Option<Arc<SourceDocument>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached document for this upload's name, reading it only on a miss
    pub fn ingest(&self, upload: &Upload) -> std::io::Result<Arc<SourceDocument>> {
        if let Some(cached) = self.current.read().as_ref() {
            if cached.file_name == upload.file_name {
                debug!("Reusing cached bytes for {}", upload.file_name);
                return Ok(Arc::clone(cached));
            }
        }

        let bytes = upload.read()?;
        let document = Arc::new(SourceDocument::new(upload.file_name.clone(), bytes));
        debug!("Read {} ({} bytes)", document.file_name, document.len());
        *self.current.write() = Some(Arc::clone(&document));
        Ok(document)
    }

    /// The cached original, for preview next to the translation
    pub fn current(&self) -> Option<Arc<SourceDocument>> {
        self.current.read().clone()
    }
}

/// Monolingual and bilingual output of one engine call
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedArtifacts {
    pub monolingual: Bytes,
    pub bilingual: Bytes,
}

/// Which of the two documents to preview or download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Monolingual,
    Bilingual,
}

impl ArtifactKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Monolingual => "mono",
            Self::Bilingual => "dual",
        }
    }
}

/// Result of a completed job
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub job_id: String,
    pub base_name: String,
    pub artifacts: TranslatedArtifacts,
}

impl TranslationResult {
    pub fn new(job_id: impl Into<String>, base_name: impl Into<String>, artifacts: TranslatedArtifacts) -> Self {
        Self {
            job_id: job_id.into(),
            base_name: base_name.into(),
            artifacts,
        }
    }

    pub fn artifact(&self, kind: ArtifactKind) -> &Bytes {
        match kind {
            ArtifactKind::Monolingual => &self.artifacts.monolingual,
            ArtifactKind::Bilingual => &self.artifacts.bilingual,
        }
    }

    /// Download name, e.g. `report-mono.pdf`
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!("{}-{}.pdf", self.base_name, kind.suffix())
    }

    /// Write both documents into `output_dir`
    ///
    /// Existing files are left alone unless `force_overwrite` is set.
    pub fn save_to(&self, output_dir: &Path, force_overwrite: bool) -> Result<Vec<PathBuf>> {
        FileManager::ensure_dir(output_dir)?;

        let targets: Vec<(ArtifactKind, PathBuf)> = [ArtifactKind::Monolingual, ArtifactKind::Bilingual]
            .into_iter()
            .map(|kind| (kind, output_dir.join(self.file_name(kind))))
            .collect();

        if !force_overwrite {
            if let Some((_, existing)) = targets.iter().find(|(_, path)| path.exists()) {
                return Err(anyhow!(
                    "Output file already exists: {:?}. Use -f to force overwrite.",
                    existing
                ));
            }
        }

        let mut written = Vec::with_capacity(targets.len());
        for (kind, path) in targets {
            FileManager::write_atomic(&path, self.artifact(kind))?;
            info!("Saved {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Holds the result of the latest completed job
#[derive(Debug, Default)]
pub struct ArtifactStore {
    current: RwLock<Option<Arc<TranslationResult>>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn store(&self, result: TranslationResult) -> Arc<TranslationResult> {
        let result = Arc::new(result);
        *self.current.write() = Some(Arc::clone(&result));
        result
    }

    /// Drop the previous result when a new job takes over
    pub(crate) fn clear(&self) {
        self.current.write().take();
    }

    pub fn current(&self) -> Option<Arc<TranslationResult>> {
        self.current.read().clone()
    }
}
