//! Client error types.

use std::time::Duration;

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure or similar; the request never landed.
    #[error("Detection service unavailable: {0}")]
    Unavailable(String),

    #[error("Detection service timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("Detection service returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    /// Sort a transport error into the variant the gateway maps to a status.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout)
        } else if err.is_connect() {
            ClientError::Unavailable(err.to_string())
        } else {
            ClientError::Network(err)
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Unavailable(_) => "unavailable",
            ClientError::Timeout(_) => "timeout",
            ClientError::Backend { .. } => "backend_error",
            ClientError::InvalidRequest(_) => "invalid_request",
            ClientError::InvalidResponse(_) => "invalid_response",
            ClientError::Network(_) => "network",
        }
    }
}
