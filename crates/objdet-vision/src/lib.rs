//! Object detection for the detector service.
//!
//! This crate provides:
//! - The detection capability seam and the YOLO ONNX capability (`onnx` feature)
//! - YOLO output decoding and per-class NMS
//! - Box annotation of uploaded images
//! - Scratch handling for uploads
//! - `DetectionService`, which runs a detect request end to end

pub mod annotate;
pub mod capability;
pub mod decode;
pub mod error;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pipeline;
pub mod scratch;

pub use annotate::annotate;
pub use capability::{load_capability, DetectionCapability, ModelConfig, COCO_CLASSES};
pub use decode::{decode_output, non_maximum_suppression, Candidate, DecodeParams};
pub use error::{VisionError, VisionResult};
#[cfg(feature = "onnx")]
pub use onnx::YoloOnnxDetector;
pub use pipeline::{DetectOutcome, DetectionService, Upload, SERVICE_NAME};
pub use scratch::ScratchUpload;
