//! API error types.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use objdet_client::ClientError;
use objdet_storage::StorageError;
use objdet_vision::VisionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::config::is_production_env;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    /// Inference failed; the detail is logged, never returned.
    #[error("Detection failed")]
    DetectionFailed(String),

    #[error("Detection service unavailable")]
    BackendUnavailable(String),

    #[error("Detection service timed out after {0} seconds")]
    BackendTimeout(u64),

    #[error("Detection service error: {message}")]
    BackendError { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BackendTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            ApiError::ModelUnavailable(_)
            | ApiError::DetectionFailed(_)
            | ApiError::BackendError { .. }
            | ApiError::Internal(_)
            | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ApiError::DetectionFailed(_) => "DETECTION_FAILED",
            ApiError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            ApiError::BackendTimeout(_) => "BACKEND_TIMEOUT",
            ApiError::BackendError { .. } => "BACKEND_ERROR",
            ApiError::Storage(StorageError::NotFound(_)) => "NOT_FOUND",
            ApiError::Storage(StorageError::InvalidKey(_)) => "INVALID_INPUT",
            ApiError::Internal(_) | ApiError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Internal(_))
            || matches!(self, ApiError::Storage(e) if !e.is_not_found() && !matches!(e, StorageError::InvalidKey(_)))
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::ModelUnavailable(msg) => ApiError::ModelUnavailable(msg),
            VisionError::InvalidInput(msg) => ApiError::BadRequest(msg),
            VisionError::InferenceFailed(msg) => ApiError::DetectionFailed(msg),
            VisionError::Storage(e) => ApiError::Storage(e),
            // Both carry filesystem paths; the pipeline has already logged them.
            VisionError::Scratch(_) => ApiError::internal("Failed to stage upload"),
            VisionError::Annotation(_) => ApiError::internal("Failed to annotate image"),
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unavailable(msg) => ApiError::BackendUnavailable(msg),
            ClientError::Network(e) => ApiError::BackendUnavailable(e.to_string()),
            ClientError::Timeout(d) => ApiError::BackendTimeout(d.as_secs()),
            ClientError::Backend { status, message } => ApiError::BackendError { status, message },
            ClientError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            ClientError::InvalidResponse(msg) => {
                ApiError::Internal(format!("invalid response from detection service: {}", msg))
            }
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

/// Error body returned by both services.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ApiError::DetectionFailed(detail) = &self {
            error!(detail = %detail, "Detection failed");
        }

        // Don't expose internal error details in production
        let detail = if self.is_internal() && is_production_env() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}
