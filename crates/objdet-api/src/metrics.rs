//! Prometheus metrics for both servers.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "objdet_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "objdet_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "objdet_http_requests_in_flight";

    // Detection metrics
    pub const DETECTIONS_TOTAL: &str = "objdet_detections_total";
    pub const OBJECTS_DETECTED_TOTAL: &str = "objdet_objects_detected_total";
    pub const DETECT_DURATION_SECONDS: &str = "objdet_detect_duration_seconds";

    // Gateway metrics
    pub const BACKEND_FAILURES_TOTAL: &str = "objdet_backend_failures_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a completed detect request.
pub fn record_detection(object_count: usize, duration_secs: f64) {
    counter!(names::DETECTIONS_TOTAL, "outcome" => "success").increment(1);
    counter!(names::OBJECTS_DETECTED_TOTAL).increment(object_count as u64);
    histogram!(names::DETECT_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed detect request, labelled by pipeline stage.
pub fn record_detection_failure(stage: &'static str) {
    counter!(names::DETECTIONS_TOTAL, "outcome" => "failure", "stage" => stage).increment(1);
}

/// Record a failed call from the gateway to the detection service.
pub fn record_backend_failure(kind: &'static str) {
    counter!(names::BACKEND_FAILURES_TOTAL, "kind" => kind).increment(1);
}

/// Sanitize path for metrics labels (collapse result keys).
fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["", "results", key] if !key.is_empty() => "/results/:key".to_string(),
        ["", "results", key, rest @ ..] if !key.is_empty() => {
            let mut sanitized = "/results/:key".to_string();
            for segment in rest {
                sanitized.push('/');
                sanitized.push_str(segment);
            }
            sanitized
        }
        _ => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
