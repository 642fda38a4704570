//! Axum HTTP servers for the object detection pipeline.
//!
//! This crate provides:
//! - The detection service (`/detect`, `/results`, `/health`, `/model/info`)
//! - The public gateway that validates uploads and forwards them
//! - Shared middleware, error mapping and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upload;

pub use config::{DetectorConfig, GatewayConfig};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::{create_detector_router, create_gateway_router};
pub use state::{DetectorState, GatewayState};
