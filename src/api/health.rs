use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use super::routes::HealthState;

pub async fn health_check(State(state): State<HealthState>) -> Json<Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the database");
            "unavailable"
        }
    };

    Json(json!({
        "status": "healthy",
        "service": "physique-coach",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "pose_model_loaded": state.pose_model_loaded,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
