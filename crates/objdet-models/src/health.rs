//! Health reports.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Serving requests normally
    Healthy,
    /// Up, but a dependency (model or upstream) is missing
    Degraded,
    /// Not reachable or not answering
    Unavailable,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Unavailable => "unavailable",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceStatus::Healthy)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health report returned by `/health` on both services.
///
/// The gateway nests the detector's report under `upstream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthStatus {
    #[serde(rename = "status")]
    pub service_status: ServiceStatus,
    pub model_loaded: bool,
    #[serde(default)]
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Extra diagnostic text, e.g. why the model is not loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Box<HealthStatus>>,
}

impl HealthStatus {
    /// Create a report for the named service.
    pub fn new(service: impl Into<String>, service_status: ServiceStatus, model_loaded: bool) -> Self {
        Self {
            service_status,
            model_loaded,
            service: service.into(),
            version: None,
            timestamp: Utc::now(),
            detail: None,
            upstream: None,
        }
    }

    /// Report for a service that could not be reached.
    pub fn unavailable(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(service, ServiceStatus::Unavailable, false).with_detail(detail)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Wrap a dependency's report inside this one.
    pub fn with_upstream(mut self, upstream: HealthStatus) -> Self {
        self.upstream = Some(Box::new(upstream));
        self
    }
}
