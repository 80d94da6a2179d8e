//! Multi-vendor price records as published by the upstream price feed.

use super::{CardId, Decimal, Medium, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Date string (`YYYY-MM-DD`) -> price.
///
/// "Latest" is the lexicographically greatest date key, which the ordered map
/// yields as its last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries(pub BTreeMap<String, Decimal>);

impl PriceSeries {
    /// The most recent (date, value) pair, if any.
    pub fn latest(&self) -> Option<(&str, Decimal)> {
        self.0
            .iter()
            .next_back()
            .map(|(date, value)| (date.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Finish name (`normal`, `foil`, ...) -> series. Unknown finishes are kept
/// verbatim so that new upstream treatments do not break parsing.
pub type FinishSeries = BTreeMap<String, PriceSeries>;

/// One vendor's listing for a card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPrices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retail: Option<FinishSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buylist: Option<FinishSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl VendorPrices {
    /// Retail when published, otherwise buylist.
    pub fn preferred_pool(&self) -> Option<&FinishSeries> {
        self.retail.as_ref().or(self.buylist.as_ref())
    }
}

/// Vendor name -> listing, for one medium.
pub type VendorTable = BTreeMap<String, VendorPrices>;

/// Per-card price record across mediums and vendors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper: Option<VendorTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtgo: Option<VendorTable>,
}

impl PriceEntry {
    pub fn vendors(&self, medium: Medium) -> Option<&VendorTable> {
        match medium {
            Medium::Paper => self.paper.as_ref(),
            Medium::Mtgo => self.mtgo.as_ref(),
        }
    }

    pub fn vendor(&self, medium: Medium, vendor: Vendor) -> Option<&VendorPrices> {
        self.vendors(medium)?.get(vendor.as_str())
    }
}

/// Price snapshot keyed by card (or sealed product) id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable(pub HashMap<CardId, PriceEntry>);

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &CardId) -> Option<&PriceEntry> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: CardId, entry: PriceEntry) {
        self.0.insert(id, entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
