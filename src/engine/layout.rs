//! Expected value of one concrete pack layout.

use super::accumulate;
use crate::domain::{Decimal, Layout, SheetValuation};
use std::collections::BTreeMap;

/// `Σ quantity × sheetEV` over the layout contents.
///
/// Sheets are looked up by name. A name with no valuation contributes zero
/// rather than failing the layout.
pub fn value_layout(layout: &Layout, sheet_evs: &BTreeMap<String, SheetValuation>) -> Decimal {
    layout
        .contents
        .iter()
        .fold(Decimal::zero(), |total, (sheet_name, quantity)| {
            let ev = sheet_evs
                .get(sheet_name)
                .map(|s| s.ev)
                .unwrap_or_default();
            accumulate(total, Decimal::from(*quantity), ev)
        })
}
