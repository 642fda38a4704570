//! Application state.

use std::path::Path;
use std::sync::Arc;

use objdet_client::{ClientResult, DetectionClient};
use objdet_storage::{ResultStore, StorageResult};
use objdet_vision::{load_capability, DetectionService};
use tracing::{info, warn};

use crate::config::{DetectorConfig, GatewayConfig};

/// Shared state of the detection service.
#[derive(Clone)]
pub struct DetectorState {
    pub config: Arc<DetectorConfig>,
    pub service: DetectionService,
}

impl DetectorState {
    /// Open the result store and try to load the model.
    ///
    /// A model that fails to load is not fatal: the service starts degraded
    /// and rejects detects until restarted with a working model.
    pub async fn new(config: DetectorConfig) -> StorageResult<Self> {
        let store = ResultStore::open(&config.output_dir).await?;

        let service = match load_capability(&config.model_config()) {
            Ok(capability) => {
                info!(model = capability.name(), "Model loaded");
                DetectionService::new(capability, store)
            }
            Err(e) => {
                warn!(error = %e, model_path = %config.model_path, "Model not loaded, detection disabled");
                DetectionService::unloaded(store, unloaded_reason(&config.model_path))
            }
        };

        Ok(Self::with_service(config, service))
    }

    /// Build state around an existing service.
    pub fn with_service(config: DetectorConfig, service: DetectionService) -> Self {
        let service = service
            .with_scratch_dir(config.scratch_dir.clone())
            .with_default_confidence(config.confidence_threshold);
        Self {
            config: Arc::new(config),
            service,
        }
    }
}

/// Client-facing reason for a missing model. Only the file name is
/// reported; the full load error stays in the logs.
fn unloaded_reason(model_path: &str) -> String {
    let name = Path::new(model_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("model");
    format!("{} could not be loaded", name)
}

/// Shared state of the gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub client: DetectionClient,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> ClientResult<Self> {
        let client = DetectionClient::new(config.client.clone())?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unloaded_detail_omits_model_directory() {
        let output = tempfile::tempdir().unwrap();
        let models = tempfile::tempdir().unwrap();
        let model_path = models.path().join("private").join("yolov8n.onnx");
        let config = DetectorConfig {
            output_dir: output.path().to_path_buf(),
            model_path: model_path.display().to_string(),
            ..DetectorConfig::default()
        };

        let state = DetectorState::new(config).await.unwrap();
        let health = state.service.health();

        assert!(!health.model_loaded);
        let detail = health.detail.unwrap();
        assert_eq!(detail, "yolov8n.onnx could not be loaded");
        assert!(!detail.contains(&models.path().display().to_string()));
    }
}
