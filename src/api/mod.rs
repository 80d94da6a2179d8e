pub mod cache;
pub mod cards;
pub mod health;
pub mod ranking;
pub mod sets;

use crate::domain::Decimal;
use crate::error::AppError;
use crate::orchestration::ValuationService;
use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ValuationService>,
}

impl AppState {
    pub fn new(service: Arc<ValuationService>) -> Self {
        Self { service }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/sets", get(sets::list_sets))
        .route("/v1/sets/:code/valuation", get(sets::get_set_valuation))
        .route(
            "/v1/sets/:code/products/:product_type/cards",
            get(sets::get_product_cards),
        )
        .route("/v1/cards/:id/price", get(cards::get_card_price))
        .route("/v1/ranking", get(ranking::get_ranking))
        .route("/v1/cache", delete(cache::clear_cache))
        .layer(cors)
        .with_state(state)
}

/// Parse an optional `minPrice` query value. Blank means "use the default".
pub(crate) fn parse_min_price(raw: Option<&str>) -> Result<Option<Decimal>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let value = Decimal::from_str_canonical(raw)
        .map_err(|_| AppError::BadRequest("minPrice must be a decimal".to_string()))?;
    if value < Decimal::zero() {
        return Err(AppError::BadRequest("minPrice must not be negative".to_string()));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_min_price() {
        assert_eq!(parse_min_price(None).unwrap(), None);
        assert_eq!(parse_min_price(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_min_price(Some("0.25")).unwrap(),
            Some(Decimal::from_str_canonical("0.25").unwrap())
        );
        assert!(matches!(parse_min_price(Some("abc")), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_min_price(Some("-1")), Err(AppError::BadRequest(_))));
    }
}
