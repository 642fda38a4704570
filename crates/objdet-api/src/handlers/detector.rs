//! Detection service handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use objdet_models::{
    ArtifactEntry, DetectResponse, DetectionResult, HealthStatus, ModelInfo, ResultsListing,
};
use objdet_storage::{ArtifactKind, ResultStore, StorageError};
use objdet_vision::{Upload, VisionError};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::DetectorState;
use crate::upload::UploadForm;

/// Service description and endpoint index.
pub async fn detector_index(State(state): State<DetectorState>) -> Json<Value> {
    Json(json!({
        "service": objdet_vision::SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.service.is_loaded(),
        "endpoints": {
            "detect": "POST /detect",
            "results": "GET /results",
            "result": "GET /results/{key}",
            "result_image": "GET /results/{key}/image",
            "health": "GET /health",
            "model_info": "GET /model/info",
        }
    }))
}

/// Run detection on an uploaded image.
///
/// The model check comes first so an unloaded detector never reads the
/// upload.
pub async fn detect(
    State(state): State<DetectorState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DetectResponse>> {
    if !state.service.is_loaded() {
        metrics::record_detection_failure("model");
        return Err(ApiError::from(VisionError::model_unavailable(
            "detection model is not loaded",
        )));
    }

    let form = UploadForm::read(multipart?).await?;
    let Some(image) = form.image else {
        metrics::record_detection_failure("validation");
        return Err(ApiError::bad_request("No image file provided"));
    };

    let upload = Upload {
        filename: image.filename,
        bytes: image.bytes,
        confidence: form.confidence,
    };

    match state.service.handle_detect(upload).await {
        Ok(outcome) => {
            metrics::record_detection(
                outcome.result.detection_count,
                outcome.processing_time.as_secs_f64(),
            );
            Ok(Json(outcome.into_response()))
        }
        Err(e) => {
            metrics::record_detection_failure(e.stage());
            Err(e.into())
        }
    }
}

/// List stored artifacts, newest key first.
pub async fn list_results(State(state): State<DetectorState>) -> ApiResult<Json<ResultsListing>> {
    let artifacts = state.service.store().list().await?;

    let mut listing = ResultsListing::default();
    for artifact in artifacts {
        let entry = ArtifactEntry {
            key: artifact.key,
            filename: artifact.filename,
            path: artifact.path.display().to_string(),
            size: artifact.size,
        };
        match artifact.kind {
            ArtifactKind::Image => listing.image_files.push(entry),
            ArtifactKind::Record => listing.json_files.push(entry),
        }
    }
    listing.total_results = listing.image_files.len();

    Ok(Json(listing))
}

/// Fetch one stored record by key (or record filename).
pub async fn get_result(
    State(state): State<DetectorState>,
    Path(key): Path<String>,
) -> ApiResult<Json<DetectionResult>> {
    let key = ResultStore::resolve_lookup(&key)?;
    let result = state.service.store().get(&key).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::not_found(format!("Result not found: {}", key)),
        other => {
            warn!(key = %key, error = %other, "Failed to load result");
            ApiError::from(other)
        }
    })?;
    Ok(Json(result))
}

/// Fetch the annotated image for a key.
pub async fn get_result_image(
    State(state): State<DetectorState>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let key = ResultStore::resolve_lookup(&key)?;
    let bytes = state.service.store().get_image(&key).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::not_found(format!("Image not found: {}", key)),
        other => ApiError::from(other),
    })?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

/// Health check; always 200, degraded when the model is missing.
pub async fn detector_health(State(state): State<DetectorState>) -> Json<HealthStatus> {
    Json(state.service.health())
}

/// Model name and class table.
pub async fn model_info(State(state): State<DetectorState>) -> ApiResult<Json<ModelInfo>> {
    state
        .service
        .model_info()
        .map(Json)
        .ok_or_else(|| ApiError::ModelUnavailable("detection model is not loaded".to_string()))
}
