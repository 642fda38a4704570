//! Artifact naming.
//!
//! Every result key owns two files in the output directory:
//! `{key}_detected.jpg` (annotated image) and `{key}_results.json` (record).
//! Listing pairs them back up by these markers.

use std::fmt;

use objdet_models::ResultKey;
use serde::{Deserialize, Serialize};

/// Marker and extension for annotated images.
pub const IMAGE_SUFFIX: &str = "_detected.jpg";

/// Marker and extension for result records.
pub const RECORD_SUFFIX: &str = "_results.json";

const IMAGE_MARKER: &str = "_detected";
const RECORD_MARKER: &str = "_results";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Kind of stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Annotated image
    Image,
    /// Serialized detection result
    Record,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Record => "record",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filename of the annotated image for a key.
pub fn image_filename(key: &ResultKey) -> String {
    format!("{}{}", key, IMAGE_SUFFIX)
}

/// Filename of the record for a key.
pub fn record_filename(key: &ResultKey) -> String {
    format!("{}{}", key, RECORD_SUFFIX)
}

/// Recognise a directory entry as an artifact, returning its key and kind.
///
/// Hidden files (including in-flight temp files) and anything without a
/// marker are ignored.
pub fn classify_artifact(filename: &str) -> Option<(String, ArtifactKind)> {
    if filename.starts_with('.') {
        return None;
    }

    let (stem, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        let key = stem.rsplit_once(IMAGE_MARKER).map(|(key, _)| key)?;
        return (!key.is_empty()).then(|| (key.to_string(), ArtifactKind::Image));
    }

    if extension == "json" {
        let key = stem.rsplit_once(RECORD_MARKER).map(|(key, _)| key)?;
        return (!key.is_empty()).then(|| (key.to_string(), ArtifactKind::Record));
    }

    None
}
