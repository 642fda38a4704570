//! Per-request scratch copies of uploaded images.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{VisionError, VisionResult};

const SCRATCH_PREFIX: &str = "objdet-upload-";
const DEFAULT_EXTENSION: &str = "jpg";

/// An upload materialized on disk for the duration of one request.
///
/// The file is deleted when the value is dropped, whichever way the request
/// ends.
#[derive(Debug)]
pub struct ScratchUpload {
    file: NamedTempFile,
}

impl ScratchUpload {
    /// Write `bytes` to a uniquely named file in `dir` (or the system temp
    /// directory), keeping the extension of `filename`.
    pub async fn create(dir: Option<PathBuf>, filename: &str, bytes: &[u8]) -> VisionResult<Self> {
        let suffix = format!(".{}", scratch_extension(filename));
        let bytes = bytes.to_vec();

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut builder = tempfile::Builder::new();
            builder.prefix(SCRATCH_PREFIX).suffix(&suffix);
            let mut file = match dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| VisionError::Scratch(format!("scratch task failed: {}", e)))?
        .map_err(|e| VisionError::Scratch(e.to_string()))?;

        debug!(path = %file.path().display(), "Created scratch upload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Lower-cased extension of `filename`, `jpg` when it has none usable.
pub fn scratch_extension(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => {
            let ext = &name[idx + 1..];
            if ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                ext.to_ascii_lowercase()
            } else {
                DEFAULT_EXTENSION.to_string()
            }
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_extension() {
        assert_eq!(scratch_extension("cat.PNG"), "png");
        assert_eq!(scratch_extension("photos/dog.jpeg"), "jpeg");
        assert_eq!(scratch_extension("noext"), "jpg");
        assert_eq!(scratch_extension(".hidden"), "jpg");
        assert_eq!(scratch_extension("trailing."), "jpg");
        assert_eq!(scratch_extension("weird.j/pg"), "jpg");
        assert_eq!(scratch_extension("bad.p g"), "jpg");
    }

    #[tokio::test]
    async fn test_scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchUpload::create(Some(dir.path().to_path_buf()), "a.png", b"abc")
            .await
            .unwrap();

        let path = scratch.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = tokio::join!(
            ScratchUpload::create(Some(dir.path().to_path_buf()), "same.jpg", b"one"),
            ScratchUpload::create(Some(dir.path().to_path_buf()), "same.jpg", b"two"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"one");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_missing_dir_is_scratch_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ScratchUpload::create(Some(missing), "a.jpg", b"x").await.unwrap_err();
        assert!(matches!(err, VisionError::Scratch(_)));
    }
}
