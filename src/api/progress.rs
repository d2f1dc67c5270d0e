use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ApiError;
use crate::models::{
    BodyMeasurement, CreateBodyMeasurement, CreateProgressLog, CreateWeightEntry,
    CreateWorkoutLog, HistoryQuery, ProgressLog, WeightEntry, WorkoutLog,
};
use crate::services::progress_service::{
    DEFAULT_MEASUREMENT_DAYS, DEFAULT_PROGRESS_DAYS, DEFAULT_WEIGHT_DAYS, DEFAULT_WORKOUT_DAYS,
};
use crate::services::ProgressService;

#[derive(Clone)]
pub struct ProgressAppState {
    pub progress_service: ProgressService,
}

pub fn progress_routes(progress_service: ProgressService, auth_service: AuthService) -> Router {
    let state = ProgressAppState { progress_service };

    Router::new()
        .route("/", get(list_progress).post(log_progress))
        .route("/workouts", get(list_workouts).post(log_workout))
        .route("/weight", get(list_weight).post(log_weight))
        .route("/measurements", get(list_measurements).post(log_measurements))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

type HistoryParams = WithRejection<Query<HistoryQuery>, ApiError>;

async fn log_progress(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateProgressLog>, ApiError>,
) -> Result<(StatusCode, Json<ProgressLog>), ApiError> {
    let log = state
        .progress_service
        .log_progress(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(log)))
}

async fn list_progress(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): HistoryParams,
) -> Result<Json<Vec<ProgressLog>>, ApiError> {
    let logs = state
        .progress_service
        .progress_logs(session.user_id, query.days_or(DEFAULT_PROGRESS_DAYS))
        .await?;
    Ok(Json(logs))
}

async fn log_workout(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateWorkoutLog>, ApiError>,
) -> Result<(StatusCode, Json<WorkoutLog>), ApiError> {
    let log = state
        .progress_service
        .log_workout(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(log)))
}

async fn list_workouts(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): HistoryParams,
) -> Result<Json<Vec<WorkoutLog>>, ApiError> {
    let logs = state
        .progress_service
        .workout_logs(session.user_id, query.days_or(DEFAULT_WORKOUT_DAYS))
        .await?;
    Ok(Json(logs))
}

async fn log_weight(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateWeightEntry>, ApiError>,
) -> Result<(StatusCode, Json<WeightEntry>), ApiError> {
    let entry = state
        .progress_service
        .log_weight(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_weight(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): HistoryParams,
) -> Result<Json<Vec<WeightEntry>>, ApiError> {
    let entries = state
        .progress_service
        .weight_entries(session.user_id, query.days_or(DEFAULT_WEIGHT_DAYS))
        .await?;
    Ok(Json(entries))
}

async fn log_measurements(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateBodyMeasurement>, ApiError>,
) -> Result<(StatusCode, Json<BodyMeasurement>), ApiError> {
    let measurement = state
        .progress_service
        .log_measurements(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

async fn list_measurements(
    State(state): State<ProgressAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): HistoryParams,
) -> Result<Json<Vec<BodyMeasurement>>, ApiError> {
    let measurements = state
        .progress_service
        .measurements(session.user_id, query.days_or(DEFAULT_MEASUREMENT_DAYS))
        .await?;
    Ok(Json(measurements))
}
