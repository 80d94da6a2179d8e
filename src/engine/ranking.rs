//! Cross-product ranking of EV against reference prices.

use super::price_resolver::{FinishPreference, PriceResolver};
use super::product::ProductValuator;
use crate::domain::{
    Decimal, PriceTable, ProductType, ProductValuation, Ranking, RankingRow, ReferencePrice,
    ReferencePriceBook, SetDetail,
};
use chrono::{Months, NaiveDate};
use std::cmp::Ordering;

/// Rows kept in each of the top and bottom lists.
pub const DEFAULT_RANKING_LIMIT: usize = 10;

/// Product types ranked unless configured otherwise.
pub fn default_product_types() -> Vec<ProductType> {
    ["play", "draft", "set"]
        .into_iter()
        .map(ProductType::from)
        .collect()
}

/// Parameters of one ranking pass.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    years_back: u32,
    min_price: Decimal,
    product_types: Vec<ProductType>,
    limit: usize,
}

impl RankingEngine {
    pub fn new(years_back: u32, min_price: Decimal) -> Self {
        Self {
            years_back,
            min_price,
            product_types: default_product_types(),
            limit: DEFAULT_RANKING_LIMIT,
        }
    }

    pub fn with_product_types(mut self, product_types: Vec<ProductType>) -> Self {
        self.product_types = product_types;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn product_types(&self) -> &[ProductType] {
        &self.product_types
    }

    /// Earliest release date still eligible on `today`.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_months(Months::new(self.years_back.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn is_eligible(&self, release_date: NaiveDate, today: NaiveDate) -> bool {
        release_date >= self.cutoff(today)
    }

    /// Rows for every included product type the set publishes.
    pub fn rows_for_set(
        &self,
        detail: &SetDetail,
        prices: &PriceTable,
        references: &ReferencePriceBook,
    ) -> Vec<RankingRow> {
        let resolver = PriceResolver::new(prices);
        let valuator = ProductValuator::new(self.min_price);

        self.product_types
            .iter()
            .filter_map(|product_type| {
                let product = detail.booster.get(product_type)?;
                let valuation =
                    valuator.value_product(&detail.code, product_type, product, &resolver);
                let observed = detail
                    .pack_listing(product_type)
                    .and_then(|listing| {
                        resolver.resolve(&listing.uuid, FinishPreference::Unconstrained)
                    })
                    .map(|quote| quote.value);
                let reference = references.resolve(&detail.code, product_type, observed);
                Some(build_row(detail, valuation, reference))
            })
            .collect()
    }

    /// Sort rows and split them into bargains and overpriced lists.
    ///
    /// Rows without a diff (no reference price) always sort after rows with
    /// one, in both lists. Equal diffs order by set code, then product type.
    pub fn rank(&self, mut rows: Vec<RankingRow>) -> Ranking {
        rows.sort_by(bargain_order);
        let top: Vec<RankingRow> = rows.iter().take(self.limit).cloned().collect();

        rows.sort_by(overpriced_order);
        rows.truncate(self.limit);

        Ranking {
            top,
            bottom: rows,
            skipped: Vec::new(),
        }
    }

    /// Full synchronous pass over already-loaded sets.
    pub fn rank_sets(
        &self,
        sets: &[SetDetail],
        prices: &PriceTable,
        references: &ReferencePriceBook,
        today: NaiveDate,
    ) -> Ranking {
        let rows = sets
            .iter()
            .filter(|detail| self.is_eligible(detail.release_date, today))
            .flat_map(|detail| self.rows_for_set(detail, prices, references))
            .collect();
        self.rank(rows)
    }
}

fn build_row(
    detail: &SetDetail,
    valuation: ProductValuation,
    reference: Option<ReferencePrice>,
) -> RankingRow {
    let reference_price = reference.map(|r| r.value);
    let diff = reference_price.and_then(|price| valuation.ev.checked_sub(price));
    let ratio = reference_price
        .filter(Decimal::is_positive)
        .and_then(|price| valuation.ev.checked_div(price));

    RankingRow {
        set_code: detail.code.clone(),
        set_name: detail.name.clone(),
        release_date: detail.release_date,
        product_type: valuation.product_type,
        ev: valuation.ev,
        currency: valuation.currency,
        reference_price,
        reference_source: reference.map(|r| r.source),
        diff,
        ratio,
    }
}

fn nulls_last(
    a: Option<Decimal>,
    b: Option<Decimal>,
    present: impl Fn(Decimal, Decimal) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => present(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn tie_break(a: &RankingRow, b: &RankingRow) -> Ordering {
    a.set_code
        .cmp(&b.set_code)
        .then_with(|| a.product_type.cmp(&b.product_type))
}

fn bargain_order(a: &RankingRow, b: &RankingRow) -> Ordering {
    nulls_last(a.diff, b.diff, |x, y| y.cmp(&x)).then_with(|| tie_break(a, b))
}

fn overpriced_order(a: &RankingRow, b: &RankingRow) -> Ordering {
    nulls_last(a.diff, b.diff, |x, y| x.cmp(&y)).then_with(|| tie_break(a, b))
}
