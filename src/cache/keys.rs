//! Cache key helpers.
//!
//! Keys are namespaced so related entries can be dropped together with a
//! prefix clear (e.g. `valuation:` after a price refresh).

use crate::domain::{Decimal, SetCode};

pub const DATASET_PREFIX: &str = "dataset:";
pub const VALUATION_PREFIX: &str = "valuation:";

pub fn set_list() -> String {
    format!("{DATASET_PREFIX}setlist")
}

pub fn set_detail(code: &SetCode) -> String {
    format!("{DATASET_PREFIX}set:{}", code.canonical())
}

pub fn prices() -> String {
    format!("{DATASET_PREFIX}prices")
}

pub fn meta() -> String {
    format!("{DATASET_PREFIX}meta")
}

/// Derived valuations for one set under one minPrice threshold.
pub fn valuation(code: &SetCode, min_price: Decimal) -> String {
    format!(
        "{VALUATION_PREFIX}{}:{}",
        code.canonical(),
        min_price.to_canonical_string()
    )
}
