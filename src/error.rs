use crate::orchestration::{LoadError, OrchestrationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// A required dataset document could not be loaded.
    #[error("Data unavailable: {0}")]
    Unavailable(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(_) => AppError::NotFound(err.to_string()),
            LoadError::DataUnavailable { .. } => AppError::Unavailable(err.to_string()),
        }
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Load(e) => e.into(),
            OrchestrationError::UnknownProduct { .. } => AppError::NotFound(err.to_string()),
            OrchestrationError::Superseded => AppError::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            // Load failures carry an explicit empty result set.
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": msg, "results": [] }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
