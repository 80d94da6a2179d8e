use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_min_price, AppState};
use crate::domain::Ranking;
use crate::error::AppError;

const MAX_YEARS_BACK: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    pub years_back: Option<u32>,
    pub min_price: Option<String>,
}

pub async fn get_ranking(
    Query(params): Query<RankingQuery>,
    State(state): State<AppState>,
) -> Result<Json<Ranking>, AppError> {
    if params.years_back.is_some_and(|y| y > MAX_YEARS_BACK) {
        return Err(AppError::BadRequest(format!(
            "yearsBack must be at most {}",
            MAX_YEARS_BACK
        )));
    }
    let min_price = parse_min_price(params.min_price.as_deref())?;

    let ranking = state.service.rank(params.years_back, min_price).await?;
    Ok(Json(ranking))
}
