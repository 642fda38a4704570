//! Gateway handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use objdet_client::ImageUpload;
use objdet_models::{HealthStatus, ServiceStatus};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::GatewayState;
use crate::upload::UploadForm;

/// Service name reported in health checks.
pub const GATEWAY_SERVICE_NAME: &str = "gateway";

/// Service description and endpoint index.
pub async fn gateway_index(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "service": GATEWAY_SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "detection_service": state.config.client.base_url,
        "endpoints": {
            "detect": "POST /detect",
            "health": "GET /health",
        }
    }))
}

/// Validate an upload and forward it to the detection service.
///
/// The detection service's JSON is relayed as-is on success.
pub async fn gateway_detect(
    State(state): State<GatewayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let form = UploadForm::read(multipart?).await?;

    let image = form
        .image
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;

    let filename = match image.filename.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ApiError::bad_request("No image file selected")),
    };

    let content_type = image.content_type.unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(ApiError::bad_request("File must be an image"));
    }

    let upload = ImageUpload::new(image.bytes, filename.clone(), content_type)
        .with_confidence(form.confidence);

    match state.client.detect(upload).await {
        Ok(body) => {
            info!(filename = %filename, "Detect relayed");
            Ok(Json(body))
        }
        Err(e) => {
            warn!(filename = %filename, stage = "forward", kind = e.kind(), error = %e, "Detect forward failed");
            metrics::record_backend_failure(e.kind());
            Err(e.into())
        }
    }
}

/// Health check with the detection service's report nested under
/// `upstream`. Always 200.
pub async fn gateway_health(State(state): State<GatewayState>) -> Json<HealthStatus> {
    let upstream = state.client.health().await;

    let status = if upstream.service_status.is_healthy() {
        ServiceStatus::Healthy
    } else {
        ServiceStatus::Degraded
    };

    Json(
        HealthStatus::new(GATEWAY_SERVICE_NAME, status, upstream.model_loaded)
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_upstream(upstream),
    )
}
