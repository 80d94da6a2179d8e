use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_min_price, AppState};
use crate::domain::{CardContribution, ProductType, ProductValuation, SetCode, SetSummary};
use crate::error::AppError;

const DEFAULT_CARD_LIMIT: usize = 20;
const MAX_CARD_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationQuery {
    pub min_price: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsQuery {
    pub min_price: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_sets(State(state): State<AppState>) -> Result<Json<Vec<SetSummary>>, AppError> {
    let sets = state.service.list_sets().await?;
    Ok(Json(sets.as_ref().clone()))
}

pub async fn get_set_valuation(
    Path(code): Path<String>,
    Query(params): Query<ValuationQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductValuation>>, AppError> {
    let code = parse_set_code(&code)?;
    let min_price = parse_min_price(params.min_price.as_deref())?;

    let valuations = state.service.value_set(&code, min_price).await?;
    Ok(Json(valuations.as_ref().clone()))
}

pub async fn get_product_cards(
    Path((code, product_type)): Path<(String, String)>,
    Query(params): Query<CardsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CardContribution>>, AppError> {
    let code = parse_set_code(&code)?;
    let product_type = ProductType::new(product_type.trim());
    let min_price = parse_min_price(params.min_price.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_CARD_LIMIT);
    if limit == 0 || limit > MAX_CARD_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_CARD_LIMIT
        )));
    }

    let rows = state
        .service
        .top_cards(&code, &product_type, min_price, limit)
        .await?;
    Ok(Json(rows))
}

pub(crate) fn parse_set_code(raw: &str) -> Result<SetCode, AppError> {
    let code = SetCode::from(raw).canonical();
    if code.as_str().is_empty() || !code.as_str().chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest("set code must be alphanumeric".to_string()));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_code() {
        assert_eq!(parse_set_code(" mkm ").unwrap(), SetCode::from("MKM"));
        assert_eq!(parse_set_code("10E").unwrap(), SetCode::from("10E"));
        assert!(parse_set_code("").is_err());
        assert!(parse_set_code("../etc").is_err());
    }
}
