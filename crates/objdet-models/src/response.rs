//! HTTP response bodies shared by the detector, the gateway and clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::key::ResultKey;
use crate::result::DetectionResult;

/// Locations of the two artifacts written for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputFiles {
    /// Annotated image
    pub image: String,
    /// Serialized `DetectionResult`
    pub json: String,
}

/// Body returned by `POST /detect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectResponse {
    #[serde(flatten)]
    pub result: DetectionResult,
    pub result_key: ResultKey,
    pub output_files: OutputFiles,
    /// Seconds spent on inference, annotation and persistence
    pub processing_time: f64,
    pub confidence_threshold: f64,
}

/// One stored artifact in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactEntry {
    pub key: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
}

/// Body returned by `GET /results`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultsListing {
    /// Annotated images, most recent key first
    pub image_files: Vec<ArtifactEntry>,
    /// Result records, most recent key first
    pub json_files: Vec<ArtifactEntry>,
    /// Number of annotated images
    pub total_results: usize,
}

/// Body returned by `GET /model/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelInfo {
    pub name: String,
    pub classes: Vec<String>,
    pub class_count: usize,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            class_count: classes.len(),
            classes,
        }
    }
}
