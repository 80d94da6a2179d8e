//! Set list entries and set detail documents.

use super::{BoosterProduct, Card, CardId, ProductType, SetCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sealed product category that denotes a single booster pack.
pub const BOOSTER_PACK_CATEGORY: &str = "booster_pack";

/// One entry of the set list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    pub code: SetCode,
    pub name: String,
    pub release_date: NaiveDate,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub set_type: Option<String>,
}

/// A sealed product listing (packs, boxes, bundles) with its own price id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedProduct {
    pub uuid: CardId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl SealedProduct {
    /// True when this listing is a single pack of the given booster type.
    pub fn is_pack_of(&self, product_type: &ProductType) -> bool {
        self.category.as_deref() == Some(BOOSTER_PACK_CATEGORY)
            && self.subtype.as_deref() == Some(product_type.as_str())
    }
}

/// Full per-set document: cards plus booster probability tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDetail {
    pub code: SetCode,
    pub name: String,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub booster: BTreeMap<ProductType, BoosterProduct>,
    #[serde(default)]
    pub sealed_product: Vec<SealedProduct>,
}

impl SetDetail {
    pub fn summary(&self) -> SetSummary {
        SetSummary {
            code: self.code.clone(),
            name: self.name.clone(),
            release_date: self.release_date,
            set_type: None,
        }
    }

    /// The single-pack listing for a product type, if the set publishes one.
    pub fn pack_listing(&self, product_type: &ProductType) -> Option<&SealedProduct> {
        self.sealed_product
            .iter()
            .find(|p| p.is_pack_of(product_type))
    }
}

/// Build stamp of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub date: String,
    pub version: String,
}
