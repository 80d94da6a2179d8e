//! Weighted aggregation of layouts into a product EV.

use super::accumulate;
use super::layout::value_layout;
use super::price_resolver::ResolvePrice;
use super::sheet::SheetValuator;
use crate::domain::{
    BoosterProduct, CardContribution, CardIndex, Decimal, Layout, ProductType, ProductValuation,
    SetCode, SetDetail, SheetBreakdown, SheetValuation, DEFAULT_CURRENCY,
};
use std::collections::BTreeMap;

/// Layout-weighted EV of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductAggregate {
    pub average_ev: Decimal,
    pub total_layout_weight: u64,
}

/// Weighted average of layout EVs.
///
/// When the layouts carry no weight at all (no layouts, or every weight is
/// zero) the EV is the flat sum of every sheet EV instead. That fallback is a
/// different formula on purpose and must stay as is.
pub fn value_product(
    layouts: &[Layout],
    sheet_evs: &BTreeMap<String, SheetValuation>,
) -> ProductAggregate {
    let total_layout_weight = layouts
        .iter()
        .fold(0u64, |acc, layout| acc.saturating_add(layout.weight()));
    let aggregated = layouts.iter().fold(Decimal::zero(), |total, layout| {
        accumulate(
            total,
            value_layout(layout, sheet_evs),
            Decimal::from(layout.weight()),
        )
    });

    let average_ev = if total_layout_weight > 0 {
        aggregated
            .checked_div(Decimal::from(total_layout_weight))
            .unwrap_or_default()
    } else {
        sheet_evs
            .values()
            .fold(Decimal::zero(), |total, s| total.checked_add(s.ev).unwrap_or(total))
    };

    ProductAggregate {
        average_ev,
        total_layout_weight,
    }
}

/// Values whole booster products: every sheet once, then every layout against
/// those sheet EVs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductValuator {
    sheets: SheetValuator,
}

impl ProductValuator {
    pub fn new(min_price: Decimal) -> Self {
        Self {
            sheets: SheetValuator::new(min_price),
        }
    }

    pub fn value_product(
        &self,
        set_code: &SetCode,
        product_type: &ProductType,
        product: &BoosterProduct,
        prices: &impl ResolvePrice,
    ) -> ProductValuation {
        let mut sheet_evs = BTreeMap::new();
        let mut breakdown = Vec::with_capacity(product.sheets.len());
        let mut currency: Option<String> = None;

        for (name, sheet) in &product.sheets {
            let outcome = self.sheets.observe_sheet(sheet, prices);
            if currency.is_none() {
                currency = outcome.observed_currency.clone();
            }
            breakdown.push(SheetBreakdown {
                name: name.clone(),
                foil: sheet.foil,
                valuation: outcome.valuation.clone(),
            });
            sheet_evs.insert(name.clone(), outcome.valuation);
        }

        let aggregate = value_product(&product.boosters, &sheet_evs);

        ProductValuation {
            set_code: set_code.clone(),
            product_type: product_type.clone(),
            ev: aggregate.average_ev,
            currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            layout_count: product.boosters.len(),
            total_layout_weight: aggregate.total_layout_weight,
            sheets: breakdown,
        }
    }

    /// One valuation per booster product type of the set, in type order.
    pub fn value_set(
        &self,
        detail: &SetDetail,
        prices: &impl ResolvePrice,
    ) -> Vec<ProductValuation> {
        detail
            .booster
            .iter()
            .map(|(product_type, product)| {
                self.value_product(&detail.code, product_type, product, prices)
            })
            .collect()
    }

    /// The cards carrying the most EV across a product's sheets.
    pub fn top_cards(
        &self,
        product: &BoosterProduct,
        prices: &impl ResolvePrice,
        cards: &CardIndex,
        limit: usize,
    ) -> Vec<CardContribution> {
        let mut rows: Vec<CardContribution> = product
            .sheets
            .iter()
            .flat_map(|(name, sheet)| self.sheets.card_contributions(name, sheet, prices, cards))
            .collect();

        rows.sort_by(|a, b| {
            b.contribution
                .cmp(&a.contribution)
                .then_with(|| a.card_id.cmp(&b.card_id))
                .then_with(|| a.sheet.cmp(&b.sheet))
        });
        rows.truncate(limit);
        rows
    }
}
