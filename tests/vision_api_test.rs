mod common;

use axum::http::StatusCode;
use std::sync::Arc;

use common::{checkerboard_png, flat_png, EmptySceneDetector, TestApp};

#[tokio::test]
async fn test_upload_produces_analysis() {
    let app = TestApp::new().await;
    let token = app.register("vision@example.com").await;
    app.record_metrics(&token).await;

    let (status, analysis) = app.upload(&token, &checkerboard_png(256), "image/png").await;
    assert_eq!(status, StatusCode::CREATED, "{analysis}");
    assert_eq!(analysis["metrics_basis"], "stored_metrics");
    assert!(analysis["bf_estimate"].as_f64().unwrap() > 0.0);
    assert!(analysis["anthro"]["shoulder_cm"].as_f64().unwrap() > 0.0);
    assert_eq!(app.stored_files(), 1);

    let (status, latest) = app.get("/api/v1/vision/latest", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], analysis["id"]);

    let (status, history) = app.get("/api/v1/vision/history?limit=5", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_without_metrics_uses_defaults() {
    let app = TestApp::new().await;
    let token = app.register("defaults@example.com").await;

    let (status, analysis) = app.upload(&token, &checkerboard_png(256), "image/png").await;
    assert_eq!(status, StatusCode::CREATED, "{analysis}");
    assert_eq!(analysis["metrics_basis"], "defaults");
}

#[tokio::test]
async fn test_no_body_detected_is_unprocessable() {
    let app = TestApp::with_detector(Some(Arc::new(EmptySceneDetector))).await;
    let token = app.register("empty@example.com").await;

    let (status, body) = app.upload(&token, &checkerboard_png(256), "image/png").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "no_body_detected");
    // the stored image is removed again
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn test_low_quality_image_rejected() {
    let app = TestApp::new().await;
    let token = app.register("blurry@example.com").await;

    let (status, body) = app.upload(&token, &flat_png(256), "image/png").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "low_image_quality");
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let app = TestApp::new().await;
    let token = app.register("gif@example.com").await;

    let (status, body) = app.upload(&token, b"GIF89a", "image/gif").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "unsupported_media_type");
}

#[tokio::test]
async fn test_oversized_upload() {
    let app = TestApp::build(Some(Arc::new(common::StandingPersonDetector)), |config| {
        config.max_upload_size = 1024;
    })
    .await;
    let token = app.register("big@example.com").await;

    let (status, body) = app.upload(&token, &vec![0u8; 4096], "image/png").await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "payload_too_large");
}

#[tokio::test]
async fn test_undecodable_image_is_bad_request() {
    let app = TestApp::new().await;
    let token = app.register("garbage@example.com").await;

    let (status, _) = app.upload(&token, b"definitely not a png", "image/png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn test_upload_unavailable_without_model() {
    let app = TestApp::with_detector(None).await;
    let token = app.register("nomodel@example.com").await;

    let (status, body) = app.upload(&token, &checkerboard_png(64), "image/png").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
}
