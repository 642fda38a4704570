//! Filesystem-backed result store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use objdet_models::{DetectionResult, ResultKey};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::{classify_artifact, image_filename, record_filename, ArtifactKind, RECORD_SUFFIX};
use crate::error::{StorageError, StorageResult};

/// Where `put` placed the two artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPaths {
    pub image: PathBuf,
    pub record: PathBuf,
}

/// A stored artifact found by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Result key the artifact belongs to
    pub key: String,
    pub kind: ArtifactKind,
    pub filename: String,
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Result store rooted at an output directory.
///
/// Each artifact is written to a hidden temp file in the same directory and
/// renamed into place, so readers never see a partial file. The image is
/// written before the record; the pair is not a transaction.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open a store, creating the output directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::config_error(format!("{}: {}", root.display(), e))
        })?;

        info!(output_dir = %root.display(), "Result store ready");
        Ok(Self { root })
    }

    /// Output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the annotated image for a key.
    pub fn image_path(&self, key: &ResultKey) -> PathBuf {
        self.root.join(image_filename(key))
    }

    /// Path of the record for a key.
    pub fn record_path(&self, key: &ResultKey) -> PathBuf {
        self.root.join(record_filename(key))
    }

    /// Persist both artifacts for `key`, replacing any existing ones.
    pub async fn put(
        &self,
        key: &ResultKey,
        annotated_image: &[u8],
        result: &DetectionResult,
    ) -> StorageResult<StoredPaths> {
        let record = serde_json::to_vec_pretty(result)?;
        let image_path = self.image_path(key);
        let record_path = self.record_path(key);

        write_atomic(&image_path, annotated_image).await?;
        write_atomic(&record_path, &record).await?;

        debug!(
            key = %key,
            image_bytes = annotated_image.len(),
            record_bytes = record.len(),
            "Stored detection result"
        );

        Ok(StoredPaths {
            image: image_path,
            record: record_path,
        })
    }

    /// List every stored artifact, most recent key first.
    pub async fn list(&self) -> StorageResult<Vec<StoredArtifact>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ListFailed(e.to_string()))?;

        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ListFailed(e.to_string()))?
        {
            let file_name = entry.file_name();
            let Some(filename) = file_name.to_str() else {
                continue;
            };
            let Some((key, kind)) = classify_artifact(filename) else {
                continue;
            };

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    // Entry vanished between readdir and stat.
                    warn!(filename, error = %e, "Skipping unreadable artifact");
                    continue;
                }
            };

            artifacts.push(StoredArtifact {
                key,
                kind,
                filename: filename.to_string(),
                path: entry.path(),
                size: metadata.len(),
            });
        }

        artifacts.sort_by(|a, b| b.key.cmp(&a.key).then_with(|| b.filename.cmp(&a.filename)));
        Ok(artifacts)
    }

    /// Load the record stored under `key`.
    pub async fn get(&self, key: &ResultKey) -> StorageResult<DetectionResult> {
        let bytes = self.read(&self.record_path(key), key).await?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::CorruptRecord {
            key: key.to_string(),
            source,
        })
    }

    /// Load the annotated image stored under `key`.
    pub async fn get_image(&self, key: &ResultKey) -> StorageResult<Vec<u8>> {
        self.read(&self.image_path(key), key).await
    }

    /// Turn a client lookup into a key. Accepts the bare key or the record
    /// filename (`{key}_results.json`).
    pub fn resolve_lookup(raw: &str) -> StorageResult<ResultKey> {
        let raw = raw.strip_suffix(RECORD_SUFFIX).unwrap_or(raw);
        Ok(ResultKey::parse(raw)?)
    }

    async fn read(&self, path: &Path, key: &ResultKey) -> StorageResult<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(key.as_str())),
            Err(e) => Err(StorageError::read_failed(format!("{}: {}", key, e))),
        }
    }
}

/// Write `bytes` to `path` through a temp file in the same directory.
async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::write_failed(format!("invalid path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StorageError::write_failed(format!("{}: {}", file_name, e)));
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StorageError::write_failed(format!("{}: {}", file_name, e)));
    }

    Ok(())
}
