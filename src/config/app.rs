use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
    pub allowed_image_types: Vec<String>,
    /// Requests per minute per client on register/login
    pub auth_rate_limit: usize,
    pub vision: VisionConfig,
}

/// Tunables for the photo analysis pipeline.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub pose_model_path: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub keypoint_min_confidence: f32,
    pub min_image_quality: f64,
    pub max_image_dimension: u32,
    pub posture: PostureThresholds,
}

/// Offsets in normalized image coordinates used by the posture rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureThresholds {
    pub rounded_shoulders: f32,
    pub asymmetric_shoulders: f32,
    pub forward_head: f32,
    pub anterior_pelvic_tilt: f32,
    pub knee_valgus_ratio: f32,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            rounded_shoulders: 0.02,
            asymmetric_shoulders: 0.03,
            forward_head: 0.05,
            anterior_pelvic_tilt: 0.4,
            knee_valgus_ratio: 0.75,
        }
    }
}

impl PostureThresholds {
    /// Overrides each offset from its `POSTURE_*` variable.
    pub fn from_env(defaults: Self) -> Result<Self> {
        Ok(Self {
            rounded_shoulders: env_parse("POSTURE_ROUNDED_SHOULDERS", defaults.rounded_shoulders)?,
            asymmetric_shoulders: env_parse(
                "POSTURE_ASYMMETRIC_SHOULDERS",
                defaults.asymmetric_shoulders,
            )?,
            forward_head: env_parse("POSTURE_FORWARD_HEAD", defaults.forward_head)?,
            anterior_pelvic_tilt: env_parse(
                "POSTURE_ANTERIOR_PELVIC_TILT",
                defaults.anterior_pelvic_tilt,
            )?,
            knee_valgus_ratio: env_parse("POSTURE_KNEE_VALGUS_RATIO", defaults.knee_valgus_ratio)?,
        })
    }

    fn issues(&self) -> Vec<String> {
        let offsets = [
            ("POSTURE_ROUNDED_SHOULDERS", self.rounded_shoulders),
            ("POSTURE_ASYMMETRIC_SHOULDERS", self.asymmetric_shoulders),
            ("POSTURE_FORWARD_HEAD", self.forward_head),
            ("POSTURE_ANTERIOR_PELVIC_TILT", self.anterior_pelvic_tilt),
        ];

        let mut issues: Vec<String> = offsets
            .into_iter()
            .filter(|(_, value)| !(value.is_finite() && *value > 0.0))
            .map(|(key, _)| format!("{key} must be a positive number"))
            .collect();
        if !(self.knee_valgus_ratio > 0.0 && self.knee_valgus_ratio <= 1.0) {
            issues.push("POSTURE_KNEE_VALGUS_RATIO must be in (0, 1]".to_string());
        }
        issues
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            pose_model_path: None,
            confidence_threshold: 0.5,
            nms_threshold: 0.45,
            keypoint_min_confidence: 0.3,
            min_image_quality: 0.7,
            max_image_dimension: 1024,
            posture: PostureThresholds::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 30,
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: 10 * 1024 * 1024,
            allowed_image_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            auth_rate_limit: 10,
            vision: VisionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let allowed_image_types = match env::var("ALLOWED_IMAGE_TYPES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.allowed_image_types,
        };

        let vision = VisionConfig {
            pose_model_path: env::var("POSE_MODEL_PATH").ok().map(PathBuf::from),
            confidence_threshold: env_parse(
                "POSE_CONFIDENCE_THRESHOLD",
                defaults.vision.confidence_threshold,
            )?,
            nms_threshold: env_parse("POSE_NMS_THRESHOLD", defaults.vision.nms_threshold)?,
            keypoint_min_confidence: env_parse(
                "KEYPOINT_MIN_CONFIDENCE",
                defaults.vision.keypoint_min_confidence,
            )?,
            min_image_quality: env_parse("MIN_IMAGE_QUALITY", defaults.vision.min_image_quality)?,
            max_image_dimension: env_parse(
                "MAX_IMAGE_DIMENSION",
                defaults.vision.max_image_dimension,
            )?,
            posture: PostureThresholds::from_env(defaults.vision.posture)?,
        };

        Ok(AppConfig {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", defaults.port)?,
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            access_token_expire_minutes: env_parse(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                defaults.access_token_expire_minutes,
            )?,
            refresh_token_expire_days: env_parse(
                "REFRESH_TOKEN_EXPIRE_DAYS",
                defaults.refresh_token_expire_days,
            )?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_size: env_parse("MAX_UPLOAD_SIZE", defaults.max_upload_size)?,
            allowed_image_types,
            auth_rate_limit: env_parse("AUTH_RATE_LIMIT", defaults.auth_rate_limit)?,
            vision,
        })
    }

    /// Returns every problem found; an empty list means the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.is_production() {
            if self.jwt_secret == DEFAULT_JWT_SECRET {
                issues.push("JWT_SECRET must be changed in production".to_string());
            }
            if self.jwt_secret.len() < 32 {
                issues.push("JWT_SECRET must be at least 32 characters in production".to_string());
            }
        }

        let unit_range = 0.0..=1.0;
        if !unit_range.contains(&self.vision.confidence_threshold) {
            issues.push("POSE_CONFIDENCE_THRESHOLD must be between 0 and 1".to_string());
        }
        if !unit_range.contains(&self.vision.nms_threshold) {
            issues.push("POSE_NMS_THRESHOLD must be between 0 and 1".to_string());
        }
        if !unit_range.contains(&self.vision.keypoint_min_confidence) {
            issues.push("KEYPOINT_MIN_CONFIDENCE must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.vision.min_image_quality) {
            issues.push("MIN_IMAGE_QUALITY must be between 0 and 1".to_string());
        }
        if self.vision.max_image_dimension == 0 {
            issues.push("MAX_IMAGE_DIMENSION must be greater than zero".to_string());
        }
        issues.extend(self.vision.posture.issues());
        if self.max_upload_size == 0 {
            issues.push("MAX_UPLOAD_SIZE must be greater than zero".to_string());
        }
        if self.access_token_expire_minutes <= 0 {
            issues.push("ACCESS_TOKEN_EXPIRE_MINUTES must be positive".to_string());
        }

        issues
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
