//! Domain types for sealed-product valuation.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: ids, Medium, Vendor, Finish, TimeMs
//! - Upstream document shapes: price records, cards, booster tables, sets
//! - Derived valuation outputs and reference prices

pub mod booster;
pub mod card;
pub mod decimal;
pub mod price;
pub mod primitives;
pub mod reference;
pub mod set;
pub mod valuation;

pub use booster::{BoosterProduct, Layout, Sheet};
pub use card::{Card, CardIndex};
pub use decimal::Decimal;
pub use price::{FinishSeries, PriceEntry, PriceSeries, PriceTable, VendorPrices, VendorTable};
pub use primitives::{CardId, Finish, Medium, ProductType, SetCode, TimeMs, Vendor};
pub use reference::{ReferencePrice, ReferencePriceBook};
pub use set::{DatasetMeta, SealedProduct, SetDetail, SetSummary, BOOSTER_PACK_CATEGORY};
pub use valuation::{
    CardContribution, ProductValuation, Quote, Ranking, RankingRow, ReferenceSource,
    SheetBreakdown, SheetValuation, DEFAULT_CURRENCY,
};
