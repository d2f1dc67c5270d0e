use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ApiError;
use crate::models::ImageAnalysis;
use crate::services::VisionAnalysisService;

/// Multipart framing on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;
const IMAGE_FIELD: &str = "image";

#[derive(Clone)]
pub struct VisionAppState {
    pub vision_service: VisionAnalysisService,
    pub max_upload_size: usize,
    pub allowed_image_types: Arc<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryLimit {
    pub limit: Option<u32>,
}

pub fn vision_routes(state: VisionAppState, auth_service: AuthService) -> Router {
    let body_limit = state.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/upload", post(upload_image))
        .route("/latest", get(latest_analysis))
        .route("/history", get(analysis_history))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

fn read_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { max_bytes }
    } else {
        err.into()
    }
}

/// Upload a full-body photo and run the measurement pipeline on it
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
async fn upload_image(
    State(state): State<VisionAppState>,
    Extension(session): Extension<UserSession>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageAnalysis>), ApiError> {
    if !state.vision_service.is_available() {
        return Err(ApiError::ServiceUnavailable(
            "Photo analysis is not available: no pose model is loaded".to_string(),
        ));
    }

    let max_bytes = state.max_upload_size;
    let mut upload: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, max_bytes))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .map(|ct| ct.essence_str().to_ascii_lowercase())
            .unwrap_or_default();
        if !state.allowed_image_types.iter().any(|t| *t == content_type) {
            return Err(ApiError::UnsupportedMediaType(format!(
                "{}; allowed types are {}",
                if content_type.is_empty() { "missing content type" } else { content_type.as_str() },
                state.allowed_image_types.join(", ")
            )));
        }

        let data = field.bytes().await.map_err(|e| read_error(e, max_bytes))?;
        if data.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge { max_bytes });
        }
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded image is empty".to_string()));
        }

        upload = Some((data.to_vec(), content_type));
    }

    let (data, content_type) = upload.ok_or_else(|| {
        ApiError::BadRequest(format!("Multipart field '{IMAGE_FIELD}' is required"))
    })?;

    tracing::info!(size = data.len(), content_type = %content_type, "Received photo upload");

    let analysis = state
        .vision_service
        .analyze_upload(session.user_id, data, &content_type)
        .await?;

    Ok((StatusCode::CREATED, Json(analysis)))
}

async fn latest_analysis(
    State(state): State<VisionAppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<ImageAnalysis>, ApiError> {
    state
        .vision_service
        .latest(session.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No photo analysis found".to_string()))
}

async fn analysis_history(
    State(state): State<VisionAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): WithRejection<Query<HistoryLimit>, ApiError>,
) -> Result<Json<Vec<ImageAnalysis>>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let analyses = state.vision_service.history(session.user_id, limit).await?;
    Ok(Json(analyses))
}
