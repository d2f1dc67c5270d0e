use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use crate::auth::{
    jwt_auth_middleware, rate_limit_middleware, AuthError, AuthResponse, AuthService, LoginRequest,
    MessageResponse, RateLimiter, RefreshTokenRequest, RegisterRequest, TokenResponse, UserInfo,
    UserSession,
};

type JsonBody<T> = WithRejection<Json<T>, AuthError>;

/// `/auth` routes. Credential endpoints are rate limited, session endpoints need a bearer token.
pub fn auth_routes(auth_service: AuthService, rate_limiter: RateLimiter) -> Router {
    let credentials = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let session = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(auth_service.clone(), jwt_auth_middleware));

    credentials
        .merge(session)
        .route("/refresh", post(refresh))
        .with_state(auth_service)
}

async fn register(
    State(auth): State<AuthService>,
    WithRejection(Json(request), _): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    Ok((StatusCode::CREATED, Json(auth.register(request).await?)))
}

async fn login(
    State(auth): State<AuthService>,
    WithRejection(Json(request), _): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    auth.login(request).await.map(Json)
}

#[tracing::instrument(skip_all)]
async fn refresh(
    State(auth): State<AuthService>,
    WithRejection(Json(request), _): JsonBody<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    auth.refresh_token(request).await.map(Json)
}

async fn logout(
    State(auth): State<AuthService>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<MessageResponse>, AuthError> {
    auth.logout(&session).await.map(Json)
}

async fn me(
    State(auth): State<AuthService>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<UserInfo>, AuthError> {
    auth.current_user(session.user_id).await.map(Json)
}
