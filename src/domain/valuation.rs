//! Derived valuation outputs. All of these are regenerated wholesale whenever
//! prices, thresholds, or probability tables change.

use super::{CardId, Decimal, Finish, Medium, ProductType, SetCode, Vendor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Currency reported when nothing in a computation exposes one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// A single resolved price for a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub value: Decimal,
    pub currency: Option<String>,
    pub medium: Medium,
    pub vendor: Vendor,
    pub finish: Finish,
    /// Date of the observation (latest in the winning series).
    pub date: String,
}

/// EV of one draw from a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetValuation {
    pub ev: Decimal,
    pub currency: String,
    pub total_weight: u64,
    pub card_count: usize,
}

impl SheetValuation {
    pub fn empty() -> Self {
        Self {
            ev: Decimal::zero(),
            currency: DEFAULT_CURRENCY.to_string(),
            total_weight: 0,
            card_count: 0,
        }
    }
}

/// Per-sheet line of a product breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetBreakdown {
    pub name: String,
    pub foil: bool,
    #[serde(flatten)]
    pub valuation: SheetValuation,
}

/// EV of one booster product type of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductValuation {
    pub set_code: SetCode,
    pub product_type: ProductType,
    pub ev: Decimal,
    pub currency: String,
    pub layout_count: usize,
    pub total_layout_weight: u64,
    pub sheets: Vec<SheetBreakdown>,
}

/// How much one card contributes to a sheet's EV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContribution {
    pub card_id: CardId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    pub sheet: String,
    /// Resolved value after the minimum-price floor.
    pub value: Decimal,
    /// weight / totalWeight on its sheet.
    pub probability: Decimal,
    pub contribution: Decimal,
}

/// Where a ranking reference price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSource {
    /// Observed market listing for the sealed pack.
    Observed,
    /// Manually curated trend price.
    Trend,
}

/// One (set, product type) observation in a ranking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub set_code: SetCode,
    pub set_name: String,
    pub release_date: NaiveDate,
    pub product_type: ProductType,
    pub ev: Decimal,
    pub currency: String,
    pub reference_price: Option<Decimal>,
    pub reference_source: Option<ReferenceSource>,
    /// `ev - referencePrice`.
    pub diff: Option<Decimal>,
    /// `ev / referencePrice`, only for a positive reference price.
    pub ratio: Option<Decimal>,
}

/// Best bargains and most overpriced products of a ranking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub top: Vec<RankingRow>,
    pub bottom: Vec<RankingRow>,
    /// Sets that could not be loaded and therefore have no rows.
    #[serde(default)]
    pub skipped: Vec<SetCode>,
}
