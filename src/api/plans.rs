use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ApiError;
use crate::models::{Plan, PlanRequest, PlanSummary};
use crate::services::PlanGenerationService;

#[derive(Clone)]
pub struct PlanAppState {
    pub plan_service: PlanGenerationService,
}

pub fn plan_routes(plan_service: PlanGenerationService, auth_service: AuthService) -> Router {
    let state = PlanAppState { plan_service };

    Router::new()
        .route("/", get(list_plans))
        .route("/generate", post(generate_plan))
        .route("/active", get(active_plan))
        .route("/:plan_id", get(get_plan))
        .route("/:plan_id/accept", post(accept_plan))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

/// Generate a new plan from the request, stored profile, body metrics and latest photo analysis
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn generate_plan(
    State(state): State<PlanAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<PlanRequest>, ApiError>,
) -> Result<(StatusCode, Json<Plan>), ApiError> {
    let plan = state.plan_service.generate(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn list_plans(
    State(state): State<PlanAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Vec<PlanSummary>>, ApiError> {
    let plans = state.plan_service.list(session.user_id).await?;
    Ok(Json(plans))
}

async fn active_plan(
    State(state): State<PlanAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Plan>, ApiError> {
    state
        .plan_service
        .active(session.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No active plan".to_string()))
}

async fn get_plan(
    State(state): State<PlanAppState>,
    Extension(session): Extension<UserSession>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Plan>, ApiError> {
    let plan = state.plan_service.get(session.user_id, plan_id).await?;
    Ok(Json(plan))
}

/// Activate a plan and schedule its check-ins
async fn accept_plan(
    State(state): State<PlanAppState>,
    Extension(session): Extension<UserSession>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Plan>, ApiError> {
    let plan = state.plan_service.accept(session.user_id, plan_id).await?;
    Ok(Json(plan))
}
