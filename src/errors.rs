use axum::{
    extract::multipart::MultipartError,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::models::validation_messages;
use crate::services::nutrition_service::NutritionError;
use crate::services::vision_analysis_service::VisionError;

/// Errors returned by every non-auth handler
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Image exceeds the maximum upload size of {max_bytes} bytes")]
    PayloadTooLarge { max_bytes: usize },
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Image quality too low ({score:.2} < {minimum:.2}); retake the photo in better light and focus")]
    LowImageQuality { score: f64, minimum: f64 },
    #[error("No body detected in the image; make sure your whole body is visible")]
    NoBodyDetected,
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            ApiError::LowImageQuality { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "low_image_quality")
            }
            ApiError::NoBodyDetected => (StatusCode::UNPROCESSABLE_ENTITY, "no_body_detected"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = match &self {
            ApiError::Validation(messages) => json!({
                "error": code,
                "message": messages.join("; "),
                "details": messages,
            }),
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                json!({ "error": code, "message": "Database error" })
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                json!({ "error": code, "message": self.to_string() })
            }
            _ => json!({ "error": code, "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(validation_messages(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Failed to read upload data: {}", err.body_text()))
    }
}

impl From<NutritionError> for ApiError {
    fn from(err: NutritionError) -> Self {
        ApiError::Validation(vec![err.to_string()])
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Decode(e) => ApiError::BadRequest(format!("Could not read image: {e}")),
            VisionError::LowQuality { score, minimum } => {
                ApiError::LowImageQuality { score, minimum }
            }
            VisionError::NoBodyDetected => ApiError::NoBodyDetected,
            VisionError::Inference(e) => ApiError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation(vec!["x".into()]).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NoBodyDetected.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::PayloadTooLarge { max_bytes: 10 }.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::ServiceUnavailable("model".into()).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_nutrition_error_becomes_validation() {
        let err: ApiError = NutritionError::OutOfRange {
            field: "weight_kg",
            value: 10.0,
            min: 30.0,
            max: 300.0,
        }
        .into();
        assert!(matches!(err, ApiError::Validation(ref m) if m[0].contains("weight_kg")));
    }
}
