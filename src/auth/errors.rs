use axum::{
    extract::rejection::JsonRejection,
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::password::PasswordError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Email already registered")]
    EmailAlreadyExists,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Authorization header must be 'Bearer <token>'")]
    InvalidAuthHeaderFormat,
    #[error("Too many attempts, retry in {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::InvalidToken | AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeaderFormat => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, "not_found"),
            AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "conflict"),
            AuthError::RateLimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AuthError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::Database(_) | AuthError::Jwt(_) | AuthError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(violations) => {
                AuthError::Validation(violations.iter().map(ToString::to_string).collect())
            }
            PasswordError::Bcrypt(message) => AuthError::Internal(anyhow::anyhow!(message)),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = match &self {
            AuthError::Validation(details) => json!({
                "error": code,
                "message": self.to_string(),
                "details": details,
            }),
            AuthError::Database(_) | AuthError::Jwt(_) | AuthError::Internal(_) => {
                tracing::error!(error = %self, "Auth request failed");
                json!({ "error": code, "message": "Internal server error" })
            }
            _ => json!({ "error": code, "message": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let AuthError::RateLimitExceeded { retry_after_secs } = self {
            response.headers_mut().insert(RETRY_AFTER, retry_after_secs.into());
        }
        response
    }
}
