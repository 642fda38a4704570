//! Detection capability seam.
//!
//! The model is an external collaborator: anything that can turn an image
//! file into an ordered list of pixel-space detections can back the
//! detector. Implementations are blocking and are always called from the
//! blocking thread pool.

use std::path::Path;
use std::sync::Arc;

use objdet_models::Detection;

use crate::error::{VisionError, VisionResult};

/// Opaque inference function.
pub trait DetectionCapability: Send + Sync {
    /// Model name reported by `/model/info`.
    fn name(&self) -> &str;

    /// Class table, indexed by class id.
    fn class_names(&self) -> &[String];

    /// Run inference on the image at `image_path`, keeping detections whose
    /// confidence is at least `confidence_threshold`.
    fn detect(&self, image_path: &Path, confidence_threshold: f64) -> VisionResult<Vec<Detection>>;
}

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Configuration for loading the model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// IoU threshold for NMS
    pub nms_threshold: f64,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// Load the configured model.
///
/// Fails with `ModelUnavailable` when the model file is missing or the
/// crate was built without the `onnx` feature; callers then run the
/// detector without a capability.
pub fn load_capability(config: &ModelConfig) -> VisionResult<Arc<dyn DetectionCapability>> {
    #[cfg(feature = "onnx")]
    {
        let detector = crate::onnx::YoloOnnxDetector::new(config.clone())?;
        Ok(Arc::new(detector))
    }

    #[cfg(not(feature = "onnx"))]
    {
        Err(VisionError::model_unavailable(format!(
            "{} cannot be loaded: built without the onnx feature",
            config.model_path
        )))
    }
}
