//! Curated trend prices used as ranking references when no market listing exists.

use super::{Decimal, ProductType, ReferenceSource, SetCode};
use std::collections::HashMap;

/// A resolved reference price and its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePrice {
    pub value: Decimal,
    pub source: ReferenceSource,
}

/// setCode -> productType -> curated price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencePriceBook {
    trend: HashMap<SetCode, HashMap<ProductType, Decimal>>,
}

impl ReferencePriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: SetCode, product_type: ProductType, price: Decimal) {
        self.trend
            .entry(set.canonical())
            .or_default()
            .insert(product_type, price);
    }

    pub fn with_trend(mut self, set: &str, product_type: &str, price: Decimal) -> Self {
        self.insert(SetCode::from(set), ProductType::from(product_type), price);
        self
    }

    pub fn trend(&self, set: &SetCode, product_type: &ProductType) -> Option<Decimal> {
        self.trend.get(&set.canonical())?.get(product_type).copied()
    }

    /// Observed market price first, then the curated trend price.
    pub fn resolve(
        &self,
        set: &SetCode,
        product_type: &ProductType,
        observed: Option<Decimal>,
    ) -> Option<ReferencePrice> {
        if let Some(value) = observed {
            return Some(ReferencePrice {
                value,
                source: ReferenceSource::Observed,
            });
        }
        self.trend(set, product_type).map(|value| ReferencePrice {
            value,
            source: ReferenceSource::Trend,
        })
    }

    pub fn len(&self) -> usize {
        self.trend.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
