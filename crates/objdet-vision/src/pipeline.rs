//! The detect pipeline: validate, infer, annotate, persist.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use objdet_models::{
    parse_confidence, DetectResponse, DetectionResult, HealthStatus, ModelInfo, OutputFiles,
    ResultKey, ServiceStatus, DEFAULT_CONFIDENCE_THRESHOLD,
};
use objdet_storage::{ResultStore, StoredPaths};
use tracing::{error, info};

use crate::annotate::annotate;
use crate::capability::DetectionCapability;
use crate::error::{VisionError, VisionResult};
use crate::scratch::ScratchUpload;

/// Service name reported in health checks.
pub const SERVICE_NAME: &str = "detection-service";

/// An image upload as received from a client.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// Original filename; required
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    /// Raw `confidence` form value
    pub confidence: Option<String>,
}

/// What a successful detect produced.
#[derive(Debug, Clone)]
pub struct DetectOutcome {
    pub result: DetectionResult,
    pub key: ResultKey,
    pub paths: StoredPaths,
    /// Inference through persistence
    pub processing_time: Duration,
    pub confidence_threshold: f64,
}

impl DetectOutcome {
    pub fn into_response(self) -> DetectResponse {
        DetectResponse {
            result: self.result,
            result_key: self.key,
            output_files: OutputFiles {
                image: self.paths.image.display().to_string(),
                json: self.paths.record.display().to_string(),
            },
            processing_time: self.processing_time.as_secs_f64(),
            confidence_threshold: self.confidence_threshold,
        }
    }
}

/// Detection Service core, shared by all request handlers.
///
/// The capability is optional: a detector whose model failed to load keeps
/// serving health and results, and rejects detects with `ModelUnavailable`.
#[derive(Clone)]
pub struct DetectionService {
    capability: Option<Arc<dyn DetectionCapability>>,
    load_error: Option<String>,
    store: ResultStore,
    scratch_dir: Option<PathBuf>,
    default_confidence: f64,
}

impl DetectionService {
    pub fn new(capability: Arc<dyn DetectionCapability>, store: ResultStore) -> Self {
        Self {
            capability: Some(capability),
            load_error: None,
            store,
            scratch_dir: None,
            default_confidence: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// A service with no model; `reason` is reported by health.
    pub fn unloaded(store: ResultStore, reason: impl Into<String>) -> Self {
        Self {
            capability: None,
            load_error: Some(reason.into()),
            store,
            scratch_dir: None,
            default_confidence: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Place scratch uploads in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Threshold used when a request does not supply one.
    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.capability.is_some()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn default_confidence(&self) -> f64 {
        self.default_confidence
    }

    /// Name and class table of the loaded model.
    pub fn model_info(&self) -> Option<ModelInfo> {
        self.capability
            .as_ref()
            .map(|capability| ModelInfo::new(capability.name(), capability.class_names().to_vec()))
    }

    pub fn health(&self) -> HealthStatus {
        let version = env!("CARGO_PKG_VERSION");
        match (&self.capability, &self.load_error) {
            (Some(_), _) => {
                HealthStatus::new(SERVICE_NAME, ServiceStatus::Healthy, true).with_version(version)
            }
            (None, reason) => {
                let status = HealthStatus::new(SERVICE_NAME, ServiceStatus::Degraded, false)
                    .with_version(version);
                match reason {
                    Some(reason) => status.with_detail(reason.clone()),
                    None => status,
                }
            }
        }
    }

    /// Run one detect request end to end.
    ///
    /// Nothing is written to disk unless validation passes, and nothing is
    /// touched at all when the model is not loaded.
    pub async fn handle_detect(&self, upload: Upload) -> VisionResult<DetectOutcome> {
        let capability = self.capability.clone().ok_or_else(|| {
            VisionError::model_unavailable(
                self.load_error.clone().unwrap_or_else(|| "no model configured".to_string()),
            )
        })?;

        let filename = match upload.filename.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(VisionError::invalid_input("No image file selected")),
        };
        if upload.bytes.is_empty() {
            return Err(VisionError::invalid_input("Image data is empty"));
        }

        let confidence_threshold = match upload.confidence.as_deref().map(str::trim) {
            None | Some("") => self.default_confidence,
            Some(raw) => {
                parse_confidence(Some(raw)).map_err(|e| VisionError::invalid_input(e.to_string()))?
            }
        };

        // Spawned so a caller that goes away does not cancel the work: once
        // the upload is accepted the detect runs to persistence or failure.
        let service = self.clone();
        tokio::spawn(async move {
            let outcome = service
                .run(capability, &filename, upload.bytes, confidence_threshold)
                .await;

            match &outcome {
                Ok(outcome) => info!(
                    filename = %filename,
                    key = %outcome.key,
                    detections = outcome.result.detection_count,
                    duration_ms = outcome.processing_time.as_millis() as u64,
                    "Detection completed"
                ),
                Err(e) => error!(
                    filename = %filename,
                    stage = e.stage(),
                    error = %e,
                    "Detection failed"
                ),
            }
            outcome
        })
        .await
        .map_err(|e| VisionError::inference_failed(format!("detect task failed: {}", e)))?
    }

    async fn run(
        &self,
        capability: Arc<dyn DetectionCapability>,
        filename: &str,
        bytes: Vec<u8>,
        confidence_threshold: f64,
    ) -> VisionResult<DetectOutcome> {
        // Deleted on drop, including on every early return below.
        let scratch = ScratchUpload::create(self.scratch_dir.clone(), filename, &bytes).await?;
        let scratch_path = scratch.path().to_path_buf();
        let started = Instant::now();

        let source_filename = filename.to_string();
        let (result, annotated) = tokio::task::spawn_blocking(move || {
            let detections = capability.detect(&scratch_path, confidence_threshold)?;
            let result = DetectionResult::new(source_filename, detections);
            let annotated = annotate(&bytes, &result.detections)?;
            Ok::<_, VisionError>((result, annotated))
        })
        .await
        .map_err(|e| VisionError::inference_failed(format!("inference task failed: {}", e)))??;

        let key = ResultKey::derive(result.timestamp, filename);
        let paths = self.store.put(&key, &annotated, &result).await?;
        let processing_time = started.elapsed();
        drop(scratch);

        Ok(DetectOutcome {
            result,
            key,
            paths,
            processing_time,
            confidence_threshold,
        })
    }
}
