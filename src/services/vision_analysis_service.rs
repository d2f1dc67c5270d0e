use chrono::Utc;
use image::{DynamicImage, GenericImageView};
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::VisionConfig;
use crate::errors::ApiError;
use crate::models::{
    BodyFatBreakdown, BodyMetrics, ImageAnalysis, ImageAnalysisRow, MetricsBasis, VisionMetrics,
    ANALYSIS_METHOD, ANALYSIS_VERSION,
};
use crate::services::body_composition::{self, Subject};
use crate::services::image_quality;
use crate::services::image_storage_service::ImageStorageService;
use crate::services::nutrition_service::round_to;
use crate::services::pose_estimation_service::{CocoKeypoint, PersonPose, PoseDetector};
use crate::services::user_service::UserService;

const ANALYSIS_COLUMNS: &str = "id, user_id, image_path, pose_alerts, anthro, bf_estimate, bf_breakdown,
    image_quality, confidence, landmark_confidence, waist_to_hip_ratio, metrics_basis, created_at";

/// Keypoints that must be found for the measurements to mean anything
const REQUIRED_KEYPOINTS: [CocoKeypoint; 7] = [
    CocoKeypoint::Nose,
    CocoKeypoint::LeftShoulder,
    CocoKeypoint::RightShoulder,
    CocoKeypoint::LeftHip,
    CocoKeypoint::RightHip,
    CocoKeypoint::LeftAnkle,
    CocoKeypoint::RightAnkle,
];

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image quality {score:.2} is below the minimum of {minimum:.2}")]
    LowQuality { score: f64, minimum: f64 },
    #[error("No body detected in the image")]
    NoBodyDetected,
    #[error("Pose inference failed: {0}")]
    Inference(#[source] anyhow::Error),
}

/// Decode → downscale → quality gate → pose → measurements
pub struct VisionPipeline {
    detector: Arc<dyn PoseDetector>,
    config: VisionConfig,
}

impl VisionPipeline {
    pub fn new(detector: Arc<dyn PoseDetector>, config: VisionConfig) -> Self {
        Self { detector, config }
    }

    pub fn analyze(&self, bytes: &[u8], subject: &Subject) -> Result<VisionMetrics, VisionError> {
        let image = downscale(image::load_from_memory(bytes)?, self.config.max_image_dimension);

        let quality = image_quality::assess(&image);
        if quality.score < self.config.min_image_quality {
            tracing::info!(score = quality.score, "Rejected low quality image");
            return Err(VisionError::LowQuality {
                score: round_to(quality.score, 2),
                minimum: self.config.min_image_quality,
            });
        }

        let pose = self
            .detector
            .detect(&image)
            .map_err(VisionError::Inference)?
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .ok_or(VisionError::NoBodyDetected)?;

        let min_confidence = self.config.keypoint_min_confidence;
        if !REQUIRED_KEYPOINTS
            .iter()
            .all(|kp| pose.is_visible(*kp, min_confidence))
        {
            return Err(VisionError::NoBodyDetected);
        }

        Ok(self.measure(&image, &pose, subject, quality.score))
    }

    fn measure(
        &self,
        image: &DynamicImage,
        pose: &PersonPose,
        subject: &Subject,
        quality_score: f64,
    ) -> VisionMetrics {
        let (width, height) = image.dimensions();
        let pose_px = pose.to_pixel_coords(width, height);

        let anthro = body_composition::measure_anthropometrics(&pose_px, subject.height_cm);
        let whr = body_composition::waist_to_hip_ratio(&anthro);

        let density = body_composition::edge_density(&image.to_luma8(), &pose_px);
        let body_fat = body_composition::blend_body_fat(BodyFatBreakdown {
            navy: body_composition::navy_body_fat(subject.sex, &anthro, subject.height_cm),
            visual: body_composition::visual_body_fat(subject.sex, density),
            ratio: body_composition::ratio_body_fat(subject.sex, whr),
        });

        let pose_alerts = body_composition::detect_posture_flags(
            pose,
            &self.config.posture,
            self.config.keypoint_min_confidence,
        );

        VisionMetrics {
            pose_alerts,
            anthro,
            bf_estimate: body_fat.percentage,
            bf_breakdown: body_fat.breakdown,
            image_quality: round_to(quality_score, 2),
            confidence: body_fat.confidence,
            landmark_confidence: round_to(pose.mean_keypoint_confidence() as f64, 3),
            waist_to_hip_ratio: whr,
            analysis_method: ANALYSIS_METHOD.to_string(),
            version: ANALYSIS_VERSION.to_string(),
        }
    }
}

/// Shrink so the longest side is at most `max_dimension`
fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width.max(height) <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, image::imageops::FilterType::Triangle)
}

/// Stores uploads, runs the pipeline off the async runtime and persists the results
#[derive(Clone)]
pub struct VisionAnalysisService {
    db: SqlitePool,
    storage: ImageStorageService,
    pipeline: Option<Arc<VisionPipeline>>,
    users: UserService,
}

impl VisionAnalysisService {
    pub fn new(
        db: SqlitePool,
        storage: ImageStorageService,
        pipeline: Option<Arc<VisionPipeline>>,
    ) -> Self {
        Self {
            users: UserService::new(db.clone()),
            db,
            storage,
            pipeline,
        }
    }

    pub fn is_available(&self) -> bool {
        self.pipeline.is_some()
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn analyze_upload(
        &self,
        user_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<ImageAnalysis, ApiError> {
        let pipeline = self.pipeline.clone().ok_or_else(|| {
            ApiError::ServiceUnavailable("Photo analysis is not available".to_string())
        })?;

        let (subject, metrics_basis) = subject_from(self.users.latest_body_metrics(user_id).await?);

        let analysis_id = Uuid::new_v4();
        let path = self
            .storage
            .store_image(user_id, analysis_id, &data, content_type)
            .await?;

        let outcome = tokio::task::spawn_blocking(move || pipeline.analyze(&data, &subject))
            .await
            .map_err(|e| ApiError::Internal(e.into()));

        let metrics = match outcome {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(err)) => {
                self.discard(&path).await;
                return Err(err.into());
            }
            Err(err) => {
                self.discard(&path).await;
                return Err(err);
            }
        };

        let row = sqlx::query_as::<_, ImageAnalysisRow>(&format!(
            "INSERT INTO image_analyses ({ANALYSIS_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {ANALYSIS_COLUMNS}"
        ))
        .bind(analysis_id)
        .bind(user_id)
        .bind(path.to_string_lossy().into_owned())
        .bind(Json(&metrics.pose_alerts))
        .bind(Json(&metrics.anthro))
        .bind(metrics.bf_estimate)
        .bind(Json(&metrics.bf_breakdown))
        .bind(metrics.image_quality)
        .bind(metrics.confidence.as_str())
        .bind(metrics.landmark_confidence)
        .bind(metrics.waist_to_hip_ratio)
        .bind(metrics_basis.as_str())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await;

        let row = match row {
            Ok(row) => row,
            Err(err) => {
                self.discard(&path).await;
                return Err(err.into());
            }
        };

        tracing::info!(
            %user_id,
            bf_estimate = metrics.bf_estimate,
            confidence = %metrics.confidence.as_str(),
            alerts = metrics.pose_alerts.len(),
            "Completed photo analysis"
        );

        Ok(ImageAnalysis::try_from(row)?)
    }

    pub async fn latest(&self, user_id: Uuid) -> Result<Option<ImageAnalysis>, ApiError> {
        let row = sqlx::query_as::<_, ImageAnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM image_analyses
             WHERE user_id = ? ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(ImageAnalysis::try_from).transpose()?)
    }

    pub async fn history(&self, user_id: Uuid, limit: u32) -> Result<Vec<ImageAnalysis>, ApiError> {
        let rows = sqlx::query_as::<_, ImageAnalysisRow>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM image_analyses
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| ImageAnalysis::try_from(row).map_err(ApiError::from))
            .collect()
    }

    async fn discard(&self, path: &std::path::Path) {
        if let Err(err) = self.storage.delete_image(path).await {
            tracing::warn!(error = %err, "Failed to remove image after failed analysis");
        }
    }
}

fn subject_from(metrics: Option<BodyMetrics>) -> (Subject, MetricsBasis) {
    match metrics {
        Some(m) => (
            Subject {
                height_cm: m.height_cm,
                weight_kg: m.weight_kg,
                sex: m.sex,
            },
            MetricsBasis::StoredMetrics,
        ),
        None => (Subject::default(), MetricsBasis::Defaults),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::body_composition::fixtures::standing_pose;
    use crate::services::pose_estimation_service::MockPoseDetector;
    use assert_matches::assert_matches;
    use image::{ImageFormat, Luma};
    use std::io::Cursor;

    fn checkerboard_png(size: u32) -> Vec<u8> {
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

    fn pipeline_with(detector: MockPoseDetector) -> VisionPipeline {
        VisionPipeline::new(Arc::new(detector), VisionConfig::default())
    }

    #[test]
    fn test_analyze_produces_metrics() {
        let mut detector = MockPoseDetector::new();
        detector
            .expect_detect()
            .times(1)
            .returning(|_| Ok(vec![standing_pose()]));

        let metrics = pipeline_with(detector)
            .analyze(&checkerboard_png(256), &Subject::default())
            .unwrap();

        assert!(metrics.bf_estimate >= 3.0 && metrics.bf_estimate <= 50.0);
        assert!(metrics.anthro.shoulder_cm > 0.0);
        assert!(metrics.image_quality >= 0.7);
        assert_eq!(metrics.analysis_method, ANALYSIS_METHOD);
        assert!(metrics.pose_alerts.is_empty());
    }

    #[test]
    fn test_undecodable_bytes() {
        let mut detector = MockPoseDetector::new();
        detector.expect_detect().never();

        assert_matches!(
            pipeline_with(detector).analyze(b"not an image", &Subject::default()),
            Err(VisionError::Decode(_))
        );
    }

    #[test]
    fn test_flat_image_fails_quality_gate() {
        let mut detector = MockPoseDetector::new();
        detector.expect_detect().never();

        let flat = image::GrayImage::from_pixel(64, 64, Luma([128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(flat)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        assert_matches!(
            pipeline_with(detector).analyze(&bytes, &Subject::default()),
            Err(VisionError::LowQuality { score, .. }) if (score - 0.3).abs() < 1e-9
        );
    }

    #[test]
    fn test_no_person_detected() {
        let mut detector = MockPoseDetector::new();
        detector.expect_detect().returning(|_| Ok(vec![]));

        assert_matches!(
            pipeline_with(detector).analyze(&checkerboard_png(128), &Subject::default()),
            Err(VisionError::NoBodyDetected)
        );
    }

    #[test]
    fn test_hidden_ankle_is_no_body() {
        let mut pose = standing_pose();
        pose.keypoints[CocoKeypoint::LeftAnkle.index()].confidence = 0.1;

        let mut detector = MockPoseDetector::new();
        detector.expect_detect().returning(move |_| Ok(vec![pose.clone()]));

        assert_matches!(
            pipeline_with(detector).analyze(&checkerboard_png(128), &Subject::default()),
            Err(VisionError::NoBodyDetected)
        );
    }

    #[test]
    fn test_inference_error_propagates() {
        let mut detector = MockPoseDetector::new();
        detector
            .expect_detect()
            .returning(|_| Err(anyhow::anyhow!("session failed")));

        assert_matches!(
            pipeline_with(detector).analyze(&checkerboard_png(128), &Subject::default()),
            Err(VisionError::Inference(_))
        );
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let image = DynamicImage::new_luma8(2048, 1024);
        let scaled = downscale(image, 1024);
        assert_eq!(scaled.dimensions(), (1024, 512));

        let small = DynamicImage::new_luma8(300, 200);
        assert_eq!(downscale(small, 1024).dimensions(), (300, 200));
    }

    #[test]
    fn test_subject_defaults_without_metrics() {
        let (subject, basis) = subject_from(None);
        assert_eq!(subject, Subject::default());
        assert_eq!(basis, MetricsBasis::Defaults);
    }
}
