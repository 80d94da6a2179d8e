use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the dataset build stamp can be loaded.
pub async fn ready(State(state): State<AppState>) -> Response {
    match state.service.meta().await {
        Ok(meta) => Json(serde_json::json!({
            "status": "ready",
            "dataset": meta.as_ref(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
