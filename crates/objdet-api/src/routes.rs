//! Routers for both servers.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::detector::{
    detect, detector_health, detector_index, get_result, get_result_image, list_results, model_info,
};
use crate::handlers::gateway::{gateway_detect, gateway_health, gateway_index};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::{DetectorState, GatewayState};

fn metrics_routes<S: Clone + Send + Sync + 'static>(metrics_handle: Option<PrometheusHandle>) -> Router<S> {
    match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    }
}

fn with_common_layers<S: Clone + Send + Sync + 'static>(
    router: Router<S>,
    max_body_size: usize,
    cors_origins: &[String],
) -> Router<S> {
    router
        // Multipart extraction enforces its own 2 MB default otherwise.
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(cors_origins))
}

/// Create the detection service router.
pub fn create_detector_router(state: DetectorState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let routes = Router::new()
        .route("/", get(detector_index))
        .route("/detect", post(detect))
        .route("/results", get(list_results))
        .route("/results/:key", get(get_result))
        .route("/results/:key/image", get(get_result_image))
        .route("/health", get(detector_health))
        .route("/model/info", get(model_info))
        .merge(metrics_routes(metrics_handle));

    let max_body_size = state.config.max_body_size;
    let cors_origins = state.config.cors_origins.clone();
    with_common_layers(routes, max_body_size, &cors_origins).with_state(state)
}

/// Create the gateway router.
pub fn create_gateway_router(state: GatewayState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let routes = Router::new()
        .route("/", get(gateway_index))
        .route("/detect", post(gateway_detect))
        .route("/health", get(gateway_health))
        .merge(metrics_routes(metrics_handle));

    let max_body_size = state.config.max_body_size;
    let cors_origins = state.config.cors_origins.clone();
    with_common_layers(routes, max_body_size, &cors_origins).with_state(state)
}
