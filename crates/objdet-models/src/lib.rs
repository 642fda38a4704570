//! Shared data models for the object detection services.
//!
//! This crate provides Serde-serializable types for:
//! - Bounding boxes and detections in pixel space
//! - The canonical per-request detection result
//! - Result keys that address persisted artifacts
//! - Health reports shared by the detector and the gateway
//! - HTTP response bodies exchanged between the services

pub mod detection;
pub mod health;
pub mod key;
pub mod response;
pub mod result;

// Re-export common types
pub use detection::{BoundingBox, Detection};
pub use health::{HealthStatus, ServiceStatus};
pub use key::{sanitize_stem, KeyError, ResultKey};
pub use response::{ArtifactEntry, DetectResponse, ModelInfo, OutputFiles, ResultsListing};
pub use result::{parse_confidence, ConfidenceError, DetectionResult, DEFAULT_CONFIDENCE_THRESHOLD};
