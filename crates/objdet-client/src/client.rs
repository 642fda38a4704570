//! Detection service HTTP client.

use std::time::Duration;

use objdet_models::HealthStatus;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::types::ImageUpload;

/// Name the detection service is reported under when it cannot answer.
const UPSTREAM_NAME: &str = "detection-service";

/// Configuration for the detection client.
#[derive(Debug, Clone)]
pub struct DetectionClientConfig {
    /// Base URL of the detection service
    pub base_url: String,
    /// Bound on a forwarded detect
    pub detect_timeout: Duration,
    /// Bound on a health poll
    pub health_timeout: Duration,
}

impl Default for DetectionClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            detect_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl DetectionClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DETECTION_SERVICE_URL").unwrap_or(defaults.base_url),
            detect_timeout: std::env::var("DETECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.detect_timeout),
            health_timeout: std::env::var("HEALTH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.health_timeout),
        }
    }
}

/// Client for the detection service.
#[derive(Debug, Clone)]
pub struct DetectionClient {
    http: Client,
    config: DetectionClientConfig,
}

impl DetectionClient {
    /// Create a new client. Timeouts are applied per request.
    pub fn new(config: DetectionClientConfig) -> ClientResult<Self> {
        let http = Client::builder().build().map_err(ClientError::Network)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DetectionClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Forward an upload to `POST /detect` and return the service's JSON
    /// body untouched.
    pub async fn detect(&self, upload: ImageUpload) -> ClientResult<serde_json::Value> {
        let url = self.url("/detect");
        let timeout = self.config.detect_timeout;

        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| ClientError::InvalidRequest(format!("content type: {}", e)))?;
        let mut form = Form::new().part("image", part);
        if let Some(confidence) = upload.confidence {
            form = form.text("confidence", confidence);
        }

        debug!(url = %url, filename = %upload.filename, "Forwarding detect request");

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message: backend_message(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Poll `GET /health`. Never fails: any error becomes an `unavailable`
    /// report carrying the reason.
    pub async fn health(&self) -> HealthStatus {
        match self.fetch_health().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Detection service health check failed");
                HealthStatus::unavailable(UPSTREAM_NAME, e.to_string())
            }
        }
    }

    async fn fetch_health(&self) -> ClientResult<HealthStatus> {
        let timeout = self.config.health_timeout;
        let response = self
            .http
            .get(self.url("/health"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message: backend_message(&body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Pull the message out of an error body (`detail` or `error`), falling back
/// to the raw text.
fn backend_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "error"]
                .iter()
                .find_map(|field| value.get(*field).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
