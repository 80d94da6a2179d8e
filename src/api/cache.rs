use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Drop cached entries (all, or those under `prefix`) and abandon in-flight runs.
pub async fn clear_cache(
    Query(params): Query<ClearQuery>,
    State(state): State<AppState>,
) -> Json<ClearResponse> {
    let prefix = params.prefix.filter(|p| !p.is_empty());
    state.service.clear_cache(prefix.as_deref()).await;
    Json(ClearResponse {
        cleared: true,
        prefix,
    })
}
