//! Canonical detection result.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::Detection;

/// Confidence threshold applied when a request does not supply one.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;

/// Outcome of one inference request.
///
/// Built once per request by the detector and persisted as the record
/// artifact. Detections keep the order the model produced them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionResult {
    /// Filename of the uploaded image, as sent by the client
    #[serde(rename = "image_filename", alias = "source_filename")]
    pub source_filename: String,
    /// When the result was produced
    pub timestamp: DateTime<Utc>,
    /// Detections in model output order
    pub detections: Vec<Detection>,
    /// Always `detections.len()`
    pub detection_count: usize,
    /// Whether inference completed
    pub success: bool,
}

impl DetectionResult {
    /// Create a successful result stamped with the current time.
    pub fn new(source_filename: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self::at(source_filename, Utc::now(), detections)
    }

    /// Create a successful result with an explicit timestamp.
    pub fn at(
        source_filename: impl Into<String>,
        timestamp: DateTime<Utc>,
        detections: Vec<Detection>,
    ) -> Self {
        let detections: Vec<Detection> = detections.into_iter().map(Detection::normalized).collect();
        Self {
            source_filename: source_filename.into(),
            timestamp,
            detection_count: detections.len(),
            detections,
            success: true,
        }
    }

    /// Check that the stored count matches the detections and every
    /// detection satisfies its invariants.
    pub fn is_consistent(&self) -> bool {
        self.detection_count == self.detections.len()
            && self.detections.iter().all(Detection::is_valid)
    }
}

/// Errors from parsing a client-supplied confidence threshold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfidenceError {
    #[error("confidence must be a number, got {0:?}")]
    NotANumber(String),

    #[error("confidence must be between 0 and 1, got {0}")]
    OutOfRange(f64),
}

/// Parse a confidence threshold form value.
///
/// `None` or a blank value yields [`DEFAULT_CONFIDENCE_THRESHOLD`].
pub fn parse_confidence(raw: Option<&str>) -> Result<f64, ConfidenceError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_CONFIDENCE_THRESHOLD),
        Some(raw) => raw,
    };

    let value: f64 = raw
        .parse()
        .map_err(|_| ConfidenceError::NotANumber(raw.to_string()))?;

    if !value.is_finite() {
        return Err(ConfidenceError::NotANumber(raw.to_string()));
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfidenceError::OutOfRange(value));
    }

    Ok(value)
}
