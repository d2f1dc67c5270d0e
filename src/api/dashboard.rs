use axum::{
    extract::State, middleware, response::Json, routing::get, Extension, Router,
};

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ApiError;
use crate::models::{DashboardResponse, TodaysWorkout};
use crate::services::DashboardService;

#[derive(Clone)]
pub struct DashboardAppState {
    pub dashboard_service: DashboardService,
}

pub fn dashboard_routes(dashboard_service: DashboardService, auth_service: AuthService) -> Router {
    let state = DashboardAppState { dashboard_service };

    Router::new()
        .route("/", get(dashboard))
        .route("/todays-workout", get(todays_workout))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn dashboard(
    State(state): State<DashboardAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let dashboard = state.dashboard_service.dashboard(session.user_id).await?;
    Ok(Json(dashboard))
}

async fn todays_workout(
    State(state): State<DashboardAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<TodaysWorkout>, ApiError> {
    let workout = state.dashboard_service.todays_workout(session.user_id).await?;
    Ok(Json(workout))
}
