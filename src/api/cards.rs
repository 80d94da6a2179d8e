use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::sets::parse_set_code;
use super::AppState;
use crate::domain::{CardId, Finish, Quote};
use crate::engine::FinishPreference;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub set: Option<String>,
    pub finish: Option<String>,
}

pub async fn get_card_price(
    Path(id): Path<String>,
    Query(params): Query<PriceQuery>,
    State(state): State<AppState>,
) -> Result<Json<Quote>, AppError> {
    let card_id = CardId::new(id.trim());
    let preference = parse_finish_preference(params.finish.as_deref())?;
    let set = match params.set.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(raw) => Some(parse_set_code(raw)?),
    };

    state
        .service
        .resolve_price(&card_id, set.as_ref(), preference)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no price for card {}", card_id)))
}

/// `foil`, `nonfoil`, `any` (default), or an exact finish name.
fn parse_finish_preference(raw: Option<&str>) -> Result<FinishPreference, AppError> {
    let raw = raw.map(|s| s.trim().to_ascii_lowercase()).unwrap_or_default();
    match raw.as_str() {
        "" | "any" => Ok(FinishPreference::Unconstrained),
        "foil" => Ok(FinishPreference::ForceFoil),
        "nonfoil" => Ok(FinishPreference::ForceNonFoil),
        other => other.parse::<Finish>().map(FinishPreference::ForceFinish).map_err(|_| {
            AppError::BadRequest(
                "finish must be one of: any, foil, nonfoil, normal, etched".to_string(),
            )
        }),
    }
}
