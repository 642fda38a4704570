//! Detection service API tests, driving the router with a fake model.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use objdet_api::{create_detector_router, DetectorConfig, DetectorState};
use objdet_models::{BoundingBox, Detection};
use objdet_storage::ResultStore;
use objdet_vision::{DetectionCapability, DetectionService, VisionResult};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "objdet-test-boundary";

struct FakeModel {
    classes: Vec<String>,
}

impl DetectionCapability for FakeModel {
    fn name(&self) -> &str {
        "fake-yolo"
    }

    fn class_names(&self) -> &[String] {
        &self.classes
    }

    fn detect(&self, _image_path: &Path, confidence_threshold: f64) -> VisionResult<Vec<Detection>> {
        let all = vec![
            Detection::new(BoundingBox::new(2.0, 3.0, 20.0, 18.0), 0.91, 0, "person"),
            Detection::new(BoundingBox::new(10.0, 1.0, 30.0, 9.0), 0.40, 2, "car"),
        ];
        Ok(all
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect())
    }
}

struct TestApp {
    router: Router,
    output: TempDir,
    _scratch: TempDir,
}

async fn app(loaded: bool) -> TestApp {
    let output = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let config = DetectorConfig {
        output_dir: output.path().to_path_buf(),
        scratch_dir: Some(scratch.path().to_path_buf()),
        ..DetectorConfig::default()
    };

    let store = ResultStore::open(output.path()).await.unwrap();
    let service = if loaded {
        let model = FakeModel {
            classes: vec!["person".into(), "bicycle".into(), "car".into()],
        };
        DetectionService::new(Arc::new(model), store)
    } else {
        DetectionService::unloaded(store, "model file not found: models/yolov8n.onnx")
    };

    TestApp {
        router: create_detector_router(DetectorState::with_service(config, service), None),
        output,
        _scratch: scratch,
    }
}

fn png() -> Vec<u8> {
    let img = RgbImage::from_pixel(32, 24, Rgb([200, 200, 200]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

/// Build a multipart body: an optional image part plus optional text fields.
fn multipart(image: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((filename, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn output_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_detect_then_fetch_result() {
    let app = app(true).await;
    let image = png();

    let (status, body) = send_json(
        &app.router,
        detect_request(multipart(Some(("street.png", "image/png", &image)), &[])),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["image_filename"], "street.png");
    assert_eq!(body["detection_count"], 2);
    assert_eq!(body["detections"].as_array().unwrap().len(), 2);
    assert_eq!(body["detections"][0]["class_name"], "person");
    assert_eq!(body["confidence_threshold"], 0.25);
    assert!(body["processing_time"].as_f64().unwrap() >= 0.0);

    let key = body["result_key"].as_str().unwrap().to_string();
    assert!(key.ends_with("_street"));
    assert!(body["output_files"]["image"].as_str().unwrap().ends_with("_detected.jpg"));
    assert!(body["output_files"]["json"].as_str().unwrap().ends_with("_results.json"));

    // Bare key and record filename both resolve.
    for lookup in [key.clone(), format!("{}_results.json", key)] {
        let (status, record) = send_json(&app.router, get(&format!("/results/{}", lookup))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["image_filename"], "street.png");
        assert_eq!(record["detection_count"], 2);
        assert_eq!(record["detections"], body["detections"]);
    }

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/results/{}/image", key)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(image::load_from_memory(&bytes).is_ok());
}

#[tokio::test]
async fn test_detect_with_confidence_field() {
    let app = app(true).await;
    let image = png();

    let (status, body) = send_json(
        &app.router,
        detect_request(multipart(
            Some(("a.png", "image/png", &image)),
            &[("confidence", "0.5")],
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detection_count"], 1);
    assert_eq!(body["confidence_threshold"], 0.5);
}

#[tokio::test]
async fn test_detect_rejects_bad_input_without_writing() {
    let app = app(true).await;
    let image = png();

    let cases = vec![
        multipart(None, &[]),
        multipart(Some(("", "image/png", &image)), &[]),
        multipart(Some(("a.png", "image/png", b"")), &[]),
        multipart(Some(("a.png", "image/png", &image)), &[("confidence", "2")]),
        multipart(Some(("a.png", "image/png", &image)), &[("confidence", "abc")]),
    ];

    for body in cases {
        let (status, error) = send_json(&app.router, detect_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", error);
        assert_eq!(error["code"], "INVALID_INPUT");
        assert!(error["detail"].is_string());
    }

    assert!(output_files(app.output.path()).is_empty());
}

#[tokio::test]
async fn test_detect_without_multipart_is_bad_request() {
    let app = app(true).await;
    let request = Request::builder()
        .method("POST")
        .uri("/detect")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unloaded_model() {
    let app = app(false).await;
    let image = png();

    let (status, error) = send_json(
        &app.router,
        detect_request(multipart(Some(("a.png", "image/png", &image)), &[])),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["code"], "MODEL_UNAVAILABLE");
    assert!(output_files(app.output.path()).is_empty());

    let (status, health) = send_json(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["model_loaded"], false);

    let (status, _) = send(&app.router, get("/model/info")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_scratch_failure_does_not_leak_paths() {
    let output = tempfile::tempdir().unwrap();
    let parent = tempfile::tempdir().unwrap();
    let missing = parent.path().join("scratch-that-does-not-exist");
    let config = DetectorConfig {
        output_dir: output.path().to_path_buf(),
        scratch_dir: Some(missing.clone()),
        ..DetectorConfig::default()
    };
    let store = ResultStore::open(output.path()).await.unwrap();
    let model = FakeModel {
        classes: vec!["person".into()],
    };
    let service = DetectionService::new(Arc::new(model), store);
    let router = create_detector_router(DetectorState::with_service(config, service), None);

    let image = png();
    let (status, error) = send_json(
        &router,
        detect_request(multipart(Some(("a.png", "image/png", &image)), &[])),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["code"], "INTERNAL_ERROR");
    let detail = error["detail"].as_str().unwrap();
    assert!(!detail.contains(&parent.path().display().to_string()), "leaked: {}", detail);
    assert!(!detail.contains("objdet-upload"));
    assert!(output_files(output.path()).is_empty());
}

#[tokio::test]
async fn test_health_and_model_info_when_loaded() {
    let app = app(true).await;

    let (status, health) = send_json(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["service"], "detection-service");

    let (status, info) = send_json(&app.router, get("/model/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["name"], "fake-yolo");
    assert_eq!(info["class_count"], 3);
    assert_eq!(info["classes"][2], "car");
}

#[tokio::test]
async fn test_empty_results_listing() {
    let app = app(true).await;
    let (status, listing) = send_json(&app.router, get("/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["image_files"], serde_json::json!([]));
    assert_eq!(listing["json_files"], serde_json::json!([]));
    assert_eq!(listing["total_results"], 0);
}

#[tokio::test]
async fn test_results_listing_after_detects() {
    let app = app(true).await;
    let image = png();

    for name in ["alpha.png", "beta.png"] {
        let (status, _) = send(
            &app.router,
            detect_request(multipart(Some((name, "image/png", &image)), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    std::fs::write(app.output.path().join("notes.txt"), b"ignored").unwrap();

    let (status, listing) = send_json(&app.router, get("/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total_results"], 2);

    let images = listing["image_files"].as_array().unwrap();
    let records = listing["json_files"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(records.len(), 2);
    assert!(images.iter().all(|e| e["filename"].as_str().unwrap().ends_with("_detected.jpg")));
    assert!(records.iter().all(|e| e["size"].as_u64().unwrap() > 0));

    let keys: Vec<&str> = images.iter().map(|e| e["key"].as_str().unwrap()).collect();
    let mut sorted = keys.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn test_missing_and_invalid_result_keys() {
    let app = app(true).await;

    let (status, error) = send_json(&app.router, get("/results/20240101_000000_nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");

    let (status, _) = send(&app.router, get("/results/20240101_000000_nothing/image")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, error) = send_json(&app.router, get("/results/..%2Fsecret")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_index_and_response_headers() {
    let app = app(true).await;
    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let index: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(index["service"], "detection-service");
    assert_eq!(index["model_loaded"], true);
    assert_eq!(index["endpoints"]["detect"], "POST /detect");
}
