//! Detection client tests against a mock detection service.

use std::time::Duration;

use objdet_client::{ClientError, DetectionClient, DetectionClientConfig, ImageUpload};
use objdet_models::ServiceStatus;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: &str, detect_secs: u64, health_secs: u64) -> DetectionClient {
    DetectionClient::new(DetectionClientConfig {
        base_url: base_url.to_string(),
        detect_timeout: Duration::from_secs(detect_secs),
        health_timeout: Duration::from_secs(health_secs),
    })
    .unwrap()
}

fn upload() -> ImageUpload {
    ImageUpload::new(b"\x89PNG fake".to_vec(), "cat.png", "image/png")
}

#[tokio::test]
async fn test_detect_relays_body_verbatim() {
    let server = MockServer::start().await;
    let body = json!({
        "image_filename": "cat.png",
        "detections": [],
        "detection_count": 0,
        "success": true,
        "extra_field": {"kept": true}
    });
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), 5, 5);
    let relayed =
        tokio_test::assert_ok!(client.detect(upload().with_confidence(Some("0.4".to_string()))).await);
    assert_eq!(relayed, body);

    let requests = server.received_requests().await.unwrap();
    let sent = String::from_utf8_lossy(&requests[0].body);
    assert!(sent.contains(r#"name="image"; filename="cat.png""#));
    assert!(sent.to_ascii_lowercase().contains("content-type: image/png"));
    assert!(sent.contains(r#"name="confidence""#));
    assert!(sent.contains("0.4"));
}

#[tokio::test]
async fn test_detect_non_success_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"detail": "Model not loaded", "code": "MODEL_UNAVAILABLE"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server.uri(), 5, 5).detect(upload()).await.unwrap_err();
    match err {
        ClientError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Model not loaded");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_detect_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = client_for(&server.uri(), 1, 5).detect(upload()).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_secs(1)), "got {:?}", err);
    assert_eq!(err.kind(), "timeout");
}

#[tokio::test]
async fn test_detect_unreachable_backend_is_unavailable() {
    let err = client_for("http://127.0.0.1:1", 5, 5).detect(upload()).await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_detect_invalid_json_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server.uri(), 5, 5).detect(upload()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_health_parses_backend_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "model_loaded": true,
            "service": "detection-service",
            "timestamp": "2024-03-09T14:05:07Z"
        })))
        .mount(&server)
        .await;

    let health = client_for(&server.uri(), 5, 5).health().await;
    assert_eq!(health.service_status, ServiceStatus::Healthy);
    assert!(health.model_loaded);
    assert_eq!(health.service, "detection-service");
}

#[tokio::test]
async fn test_health_never_fails() {
    let unreachable = client_for("http://127.0.0.1:1", 5, 5).health().await;
    assert_eq!(unreachable.service_status, ServiceStatus::Unavailable);
    assert!(!unreachable.model_loaded);
    assert!(unreachable.detail.is_some());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let slow = client_for(&server.uri(), 5, 1).health().await;
    assert_eq!(slow.service_status, ServiceStatus::Unavailable);
}
