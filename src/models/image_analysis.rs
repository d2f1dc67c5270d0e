use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const ANALYSIS_METHOD: &str = "pose_keypoints_navy_edge_density";
pub const ANALYSIS_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PostureFlag {
    RoundedShoulders,
    AsymmetricShoulders,
    ForwardHead,
    AnteriorPelvicTilt,
    KneeValgus,
}

impl PostureFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostureFlag::RoundedShoulders => "rounded_shoulders",
            PostureFlag::AsymmetricShoulders => "asymmetric_shoulders",
            PostureFlag::ForwardHead => "forward_head",
            PostureFlag::AnteriorPelvicTilt => "anterior_pelvic_tilt",
            PostureFlag::KneeValgus => "knee_valgus",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(ConfidenceLevel::High),
            "medium" => Some(ConfidenceLevel::Medium),
            "low" => Some(ConfidenceLevel::Low),
            _ => None,
        }
    }
}

/// Whether the pixel scale came from the user's stored height or from defaults
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricsBasis {
    StoredMetrics,
    Defaults,
}

impl MetricsBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsBasis::StoredMetrics => "stored_metrics",
            MetricsBasis::Defaults => "defaults",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stored_metrics" => Some(MetricsBasis::StoredMetrics),
            "defaults" => Some(MetricsBasis::Defaults),
            _ => None,
        }
    }
}

/// Frontal body measurements in centimetres
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Anthropometrics {
    pub shoulder_cm: f64,
    pub chest_cm: f64,
    pub waist_cm: f64,
    pub hip_cm: f64,
    pub neck_cm: f64,
    pub thigh_cm: f64,
    pub arm_cm: f64,
    pub femur_to_height_ratio: f64,
}

/// The three body-fat estimates that are blended into `bf_estimate`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BodyFatBreakdown {
    pub navy: f64,
    pub visual: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisionMetrics {
    pub pose_alerts: Vec<PostureFlag>,
    pub anthro: Anthropometrics,
    pub bf_estimate: f64,
    pub bf_breakdown: BodyFatBreakdown,
    pub image_quality: f64,
    pub confidence: ConfidenceLevel,
    pub landmark_confidence: f64,
    pub waist_to_hip_ratio: f64,
    pub analysis_method: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageAnalysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_path: String,
    #[serde(flatten)]
    pub metrics: VisionMetrics,
    pub metrics_basis: MetricsBasis,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ImageAnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_path: String,
    pub pose_alerts: Json<Vec<PostureFlag>>,
    pub anthro: Json<Anthropometrics>,
    pub bf_estimate: f64,
    pub bf_breakdown: Json<BodyFatBreakdown>,
    pub image_quality: f64,
    pub confidence: String,
    pub landmark_confidence: f64,
    pub waist_to_hip_ratio: f64,
    pub metrics_basis: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ImageAnalysisRow> for ImageAnalysis {
    type Error = anyhow::Error;

    fn try_from(row: ImageAnalysisRow) -> Result<Self, Self::Error> {
        let confidence = ConfidenceLevel::from_str(&row.confidence)
            .ok_or_else(|| anyhow::anyhow!("Unknown confidence level: {}", row.confidence))?;
        let metrics_basis = MetricsBasis::from_str(&row.metrics_basis)
            .ok_or_else(|| anyhow::anyhow!("Unknown metrics basis: {}", row.metrics_basis))?;

        Ok(ImageAnalysis {
            id: row.id,
            user_id: row.user_id,
            image_path: row.image_path,
            metrics: VisionMetrics {
                pose_alerts: row.pose_alerts.0,
                anthro: row.anthro.0,
                bf_estimate: row.bf_estimate,
                bf_breakdown: row.bf_breakdown.0,
                image_quality: row.image_quality,
                confidence,
                landmark_confidence: row.landmark_confidence,
                waist_to_hip_ratio: row.waist_to_hip_ratio,
                analysis_method: ANALYSIS_METHOD.to_string(),
                version: ANALYSIS_VERSION.to_string(),
            },
            metrics_basis,
            created_at: row.created_at,
        })
    }
}
