use axum::{routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use super::auth::auth_routes;
use super::checkins::checkin_routes;
use super::dashboard::dashboard_routes;
use super::health::health_check;
use super::plans::plan_routes;
use super::progress::progress_routes;
use super::user::user_routes;
use super::vision::{vision_routes, VisionAppState};
use crate::auth::middleware::{cors_layer, security_headers_layer};
use crate::auth::{AuthService, RateLimiter};
use crate::config::AppConfig;
use crate::services::{
    CheckInService, DashboardService, ImageStorageService, PlanGenerationService, PoseDetector, ProgressService,
    VisionAnalysisService, VisionPipeline,
};

const AUTH_RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct HealthState {
    pub db: SqlitePool,
    pub pose_model_loaded: bool,
}

/// Build the full application router. Without a detector the upload endpoint
/// answers 503 and everything else keeps working.
pub fn create_routes(
    db: SqlitePool,
    config: &AppConfig,
    detector: Option<Arc<dyn PoseDetector>>,
) -> Router {
    let auth_service = AuthService::new(db.clone(), config);
    let rate_limiter = RateLimiter::new(config.auth_rate_limit, AUTH_RATE_WINDOW);

    let pipeline = detector.map(|d| Arc::new(VisionPipeline::new(d, config.vision.clone())));
    let vision_service = VisionAnalysisService::new(
        db.clone(),
        ImageStorageService::new(config.upload_dir.clone()),
        pipeline,
    );
    let plan_service = PlanGenerationService::new(db.clone(), vision_service.clone());
    let progress_service = ProgressService::new(db.clone());
    let checkin_service = CheckInService::new(db.clone());
    let dashboard_service = DashboardService::new(
        plan_service.clone(),
        progress_service.clone(),
        vision_service.clone(),
    );

    let health = HealthState {
        db: db.clone(),
        pose_model_loaded: vision_service.is_available(),
    };

    let vision_state = VisionAppState {
        vision_service,
        max_upload_size: config.max_upload_size,
        allowed_image_types: Arc::new(config.allowed_image_types.clone()),
    };

    let api_v1 = Router::new()
        .nest("/auth", auth_routes(auth_service.clone(), rate_limiter))
        .nest("/user", user_routes(db, auth_service.clone()))
        .nest("/vision", vision_routes(vision_state, auth_service.clone()))
        .nest("/plans", plan_routes(plan_service, auth_service.clone()))
        .nest("/progress", progress_routes(progress_service, auth_service.clone()))
        .nest("/checkins", checkin_routes(checkin_service, auth_service.clone()))
        .nest("/dashboard", dashboard_routes(dashboard_service, auth_service));

    Router::new()
        .route("/health", get(health_check).with_state(health))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(security_headers_layer())
}
