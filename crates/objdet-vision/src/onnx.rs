//! YOLO object detection through ONNX Runtime.
//!
//! Expects a YOLOv8/YOLO11 style export with a single `[1, 4 + C, N]`
//! output (`cx, cy, w, h` followed by per-class scores). Boxes are scaled
//! back to the pixel space of the original image.

use std::path::Path;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use objdet_models::Detection;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::capability::{DetectionCapability, ModelConfig, COCO_CLASSES};
use crate::decode::{decode_output, non_maximum_suppression, DecodeParams};
use crate::error::{VisionError, VisionResult};

/// YOLO detector backed by an ONNX Runtime session.
pub struct YoloOnnxDetector {
    session: Mutex<Session>,
    config: ModelConfig,
    name: String,
    classes: Vec<String>,
}

impl YoloOnnxDetector {
    /// Load the model at `config.model_path`.
    pub fn new(config: ModelConfig) -> VisionResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(VisionError::model_unavailable(format!(
                "model file not found: {}",
                config.model_path
            )));
        }

        let session = Mutex::new(create_session(model_path)?);
        let name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("yolo")
            .to_string();

        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Object detector initialized"
        );

        Ok(Self {
            session,
            config,
            name,
            classes: COCO_CLASSES.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Resize to the model input and convert HWC to normalized NCHW.
    fn preprocess(&self, img: &DynamicImage) -> VisionResult<Value> {
        let input_size = self.config.input_size;
        let resized = img.resize_exact(input_size, input_size, image::imageops::FilterType::Triangle);

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);

        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference_failed(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> VisionResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference_failed("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference_failed(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| VisionError::inference_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.to_vec())
    }
}

impl DetectionCapability for YoloOnnxDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }

    fn detect(&self, image_path: &Path, confidence_threshold: f64) -> VisionResult<Vec<Detection>> {
        let img = image::io::Reader::open(image_path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| VisionError::inference_failed(format!("Failed to open image: {}", e)))?
            .decode()
            .map_err(|e| VisionError::inference_failed(format!("Failed to decode image: {}", e)))?;
        let (width, height) = img.dimensions();

        let input = self.preprocess(&img)?;
        let outputs = self.run_inference(input)?;
        let params = DecodeParams {
            input_size: self.config.input_size,
            num_classes: self.classes.len(),
            orig_width: width,
            orig_height: height,
            confidence_threshold: confidence_threshold as f32,
        };
        let candidates =
            non_maximum_suppression(decode_output(&outputs, &params)?, self.config.nms_threshold);

        debug!(count = candidates.len(), "Object detection completed");

        Ok(candidates
            .into_iter()
            .map(|c| {
                Detection::new(
                    c.bbox,
                    c.confidence as f64,
                    c.class_id as u32,
                    self.classes[c.class_id].clone(),
                )
            })
            .collect())
    }
}

/// Create an ONNX Runtime session on the CPU execution provider.
fn create_session(model_path: &Path) -> VisionResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| VisionError::model_unavailable(format!("Failed to read model file: {}", e)))?;

    Session::builder()
        .map_err(|e| VisionError::model_unavailable(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::model_unavailable(format!("Failed to set optimization level: {}", e)))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::model_unavailable(format!("Failed to load ONNX model: {}", e)))
}
