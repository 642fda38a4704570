//! Error types for the detect pipeline.

use thiserror::Error;

use objdet_storage::StorageError;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while handling a detect request.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Annotation failed: {0}")]
    Annotation(String),

    #[error("Scratch file error: {0}")]
    Scratch(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl VisionError {
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::InferenceFailed(msg.into())
    }

    /// Pipeline stage the error belongs to, for logs and metrics labels.
    pub fn stage(&self) -> &'static str {
        match self {
            VisionError::ModelUnavailable(_) => "model",
            VisionError::InvalidInput(_) => "validation",
            VisionError::InferenceFailed(_) => "inference",
            VisionError::Annotation(_) => "annotation",
            VisionError::Scratch(_) => "scratch",
            VisionError::Storage(_) => "persistence",
        }
    }
}
