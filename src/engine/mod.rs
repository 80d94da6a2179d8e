//! Pure computation engine for deterministic pack valuation.
//!
//! Nothing here performs I/O: every function takes already-loaded documents
//! and returns exact decimal results.

pub mod layout;
pub mod price_resolver;
pub mod product;
pub mod ranking;
pub mod sheet;

pub use layout::value_layout;
pub use price_resolver::{FinishPreference, PriceResolver, ResolvePrice};
pub use product::{value_product, ProductAggregate, ProductValuator};
pub use ranking::{default_product_types, RankingEngine, DEFAULT_RANKING_LIMIT};
pub use sheet::{SheetOutcome, SheetValuator};

use crate::domain::Decimal;

/// `total + a × b`. A term that leaves the decimal range contributes zero.
pub(crate) fn accumulate(total: Decimal, a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b)
        .and_then(|term| total.checked_add(term))
        .unwrap_or(total)
}
