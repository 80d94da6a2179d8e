//! Booster probability tables: sheets, layouts, and products.

use super::CardId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A weight as published upstream. Anything that is not a positive count
/// (negative, fractional below one) reads as zero so a malformed sheet
/// contributes nothing instead of rejecting the whole set document.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawWeight {
    Count(u64),
    Signed(i64),
    Fractional(f64),
}

impl RawWeight {
    fn count(self) -> u64 {
        match self {
            RawWeight::Count(n) => n,
            RawWeight::Signed(_) => 0,
            RawWeight::Fractional(f) if f >= 1.0 => f.min(u64::MAX as f64) as u64,
            RawWeight::Fractional(_) => 0,
        }
    }
}

fn lenient_weight<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawWeight>::deserialize(deserializer)?.map(RawWeight::count))
}

fn lenient_weights<'de, D, K>(deserializer: D) -> Result<BTreeMap<K, u64>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord,
{
    let raw = BTreeMap::<K, RawWeight>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, w)| (key, w.count())).collect())
}

/// A named, weighted card pool that a layout draws from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    /// Card id -> relative weight. Ordered so iteration is deterministic.
    #[serde(default, deserialize_with = "lenient_weights")]
    pub cards: BTreeMap<CardId, u64>,
    /// Published total weight; derived from `cards` when absent.
    #[serde(default, deserialize_with = "lenient_weight")]
    pub total_weight: Option<u64>,
    #[serde(default)]
    pub foil: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_duplicates: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_colors: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<bool>,
}

impl Sheet {
    pub fn total_weight(&self) -> u64 {
        self.total_weight.unwrap_or_else(|| {
            self.cards
                .values()
                .fold(0u64, |acc, w| acc.saturating_add(*w))
        })
    }
}

/// One pack recipe: how many cards are drawn from each sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Sheet name -> draw quantity. Names are resolved against the product's
    /// sheets at valuation time; an unknown name contributes nothing.
    #[serde(default, deserialize_with = "lenient_weights")]
    pub contents: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: Option<u64>,
}

impl Layout {
    /// Relative weight among sibling layouts (1 when unpublished).
    pub fn weight(&self) -> u64 {
        self.weight.unwrap_or(1)
    }
}

/// A booster product type within a set: its sheets and layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoosterProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sheets: BTreeMap<String, Sheet>,
    #[serde(default)]
    pub boosters: Vec<Layout>,
    #[serde(
        default,
        deserialize_with = "lenient_weight",
        skip_serializing_if = "Option::is_none"
    )]
    pub boosters_total_weight: Option<u64>,
}
