use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ApiError;
use crate::models::{CheckIn, CheckInHistoryQuery, CompleteCheckIn, CreateCheckIn};
use crate::services::CheckInService;

#[derive(Clone)]
pub struct CheckInAppState {
    pub checkin_service: CheckInService,
}

pub fn checkin_routes(checkin_service: CheckInService, auth_service: AuthService) -> Router {
    let state = CheckInAppState { checkin_service };

    Router::new()
        .route("/", post(create_check_in))
        .route("/pending", get(pending_check_ins))
        .route("/history", get(check_in_history))
        .route("/:check_in_id/complete", post(complete_check_in))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn create_check_in(
    State(state): State<CheckInAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateCheckIn>, ApiError>,
) -> Result<(StatusCode, Json<CheckIn>), ApiError> {
    let check_in = state.checkin_service.create(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(check_in)))
}

/// Check-ins due today or earlier that still need an answer
async fn pending_check_ins(
    State(state): State<CheckInAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Vec<CheckIn>>, ApiError> {
    let pending = state
        .checkin_service
        .pending(session.user_id, Utc::now().date_naive())
        .await?;
    Ok(Json(pending))
}

async fn check_in_history(
    State(state): State<CheckInAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): WithRejection<Query<CheckInHistoryQuery>, ApiError>,
) -> Result<Json<Vec<CheckIn>>, ApiError> {
    let history = state
        .checkin_service
        .history(session.user_id, query.limit_or_default())
        .await?;
    Ok(Json(history))
}

async fn complete_check_in(
    State(state): State<CheckInAppState>,
    Extension(session): Extension<UserSession>,
    Path(check_in_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<CompleteCheckIn>, ApiError>,
) -> Result<Json<CheckIn>, ApiError> {
    let check_in = state
        .checkin_service
        .complete(session.user_id, check_in_id, request)
        .await?;
    Ok(Json(check_in))
}
