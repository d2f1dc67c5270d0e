use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use sqlx::SqlitePool;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ApiError;
use crate::models::{BodyMetrics, BodyMetricsRequest, UpdateProfileRequest, UserProfile};
use crate::services::UserService;

#[derive(Clone)]
pub struct UserAppState {
    pub user_service: UserService,
}

pub fn user_routes(db: SqlitePool, auth_service: AuthService) -> Router {
    let state = UserAppState {
        user_service: UserService::new(db),
    };

    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/metrics", post(record_metrics))
        .route("/metrics/latest", get(latest_metrics))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn get_profile(
    State(state): State<UserAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.user_service.get_profile(session.user_id).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn update_profile(
    State(state): State<UserAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .user_service
        .update_profile(session.user_id, request)
        .await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn record_metrics(
    State(state): State<UserAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<BodyMetricsRequest>, ApiError>,
) -> Result<(StatusCode, Json<BodyMetrics>), ApiError> {
    let metrics = state
        .user_service
        .record_body_metrics(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(metrics)))
}

async fn latest_metrics(
    State(state): State<UserAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<BodyMetrics>, ApiError> {
    state
        .user_service
        .latest_body_metrics(session.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No body metrics recorded yet".to_string()))
}
