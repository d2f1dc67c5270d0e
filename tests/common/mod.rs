#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Luma};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use physique_coach::api::create_routes;
use physique_coach::config::{create_in_memory_pool, run_migrations, AppConfig};
use physique_coach::services::pose_estimation_service::{
    CocoKeypoint, Keypoint, PersonPose, PoseDetector, NUM_KEYPOINTS,
};

pub const PASSWORD: &str = "Str0ng!Passw0rd";
const BOUNDARY: &str = "physique-coach-test-boundary";

/// Detector that always finds the same upright person
pub struct StandingPersonDetector;

impl PoseDetector for StandingPersonDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<PersonPose>> {
        Ok(vec![standing_pose()])
    }
}

/// Detector that never finds anyone
pub struct EmptySceneDetector;

impl PoseDetector for EmptySceneDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<PersonPose>> {
        Ok(Vec::new())
    }
}

pub fn standing_pose() -> PersonPose {
    let mut keypoints = vec![
        Keypoint {
            x: 0.5,
            y: 0.5,
            confidence: 0.9,
        };
        NUM_KEYPOINTS
    ];
    let points = [
        (CocoKeypoint::Nose, 0.5, 0.1),
        (CocoKeypoint::LeftEye, 0.51, 0.09),
        (CocoKeypoint::RightEye, 0.49, 0.09),
        (CocoKeypoint::LeftEar, 0.52, 0.1),
        (CocoKeypoint::RightEar, 0.48, 0.1),
        (CocoKeypoint::LeftShoulder, 0.6, 0.2),
        (CocoKeypoint::RightShoulder, 0.4, 0.2),
        (CocoKeypoint::LeftElbow, 0.63, 0.35),
        (CocoKeypoint::RightElbow, 0.37, 0.35),
        (CocoKeypoint::LeftWrist, 0.64, 0.48),
        (CocoKeypoint::RightWrist, 0.36, 0.48),
        (CocoKeypoint::LeftHip, 0.56, 0.5),
        (CocoKeypoint::RightHip, 0.44, 0.5),
        (CocoKeypoint::LeftKnee, 0.56, 0.7),
        (CocoKeypoint::RightKnee, 0.44, 0.7),
        (CocoKeypoint::LeftAnkle, 0.56, 0.9),
        (CocoKeypoint::RightAnkle, 0.44, 0.9),
    ];
    for (kp, x, y) in points {
        keypoints[kp.index()] = Keypoint {
            x,
            y,
            confidence: 0.9,
        };
    }

    PersonPose {
        bbox_x: 0.5,
        bbox_y: 0.5,
        bbox_width: 0.4,
        bbox_height: 0.9,
        confidence: 0.92,
        keypoints,
    }
}

/// Sharp, well exposed test image that passes the quality gate
pub fn checkerboard_png(size: u32) -> Vec<u8> {
    let gray = image::GrayImage::from_fn(size, size, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Luma([64])
        } else {
            Luma([192])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Uniform gray image that fails the quality gate
pub fn flat_png(size: u32) -> Vec<u8> {
    let gray = image::GrayImage::from_pixel(size, size, Luma([128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn test_config(upload_dir: &TempDir) -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        jwt_secret: "integration-test-secret-with-enough-length".to_string(),
        upload_dir: upload_dir.path().to_path_buf(),
        auth_rate_limit: 100,
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_detector(Some(Arc::new(StandingPersonDetector))).await
    }

    pub async fn with_detector(detector: Option<Arc<dyn PoseDetector>>) -> Self {
        Self::build(detector, |_| {}).await
    }

    pub async fn build(
        detector: Option<Arc<dyn PoseDetector>>,
        customize: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let pool = create_in_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let uploads = TempDir::new().unwrap();
        let mut config = test_config(&uploads);
        customize(&mut config);

        Self {
            router: create_routes(pool.clone(), &config, detector),
            pool,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Register a user and return their access token
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "full_name": "Test Athlete"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn record_metrics(&self, token: &str) {
        let (status, body) = self
            .post(
                "/api/v1/user/metrics",
                token,
                json!({ "weight_kg": 82.0, "height_cm": 180.0, "age": 30, "sex": "male" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "metrics failed: {body}");
    }

    pub async fn upload(&self, token: &str, data: &[u8], content_type: &str) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/vision/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Number of files stored under the upload directory
    pub fn stored_files(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(self.uploads.path())
    }
}
