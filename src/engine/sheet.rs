//! Expected value of a single draw from a weighted sheet.

use super::accumulate;
use super::price_resolver::{FinishPreference, ResolvePrice};
use crate::domain::{
    CardContribution, CardIndex, Decimal, Sheet, SheetValuation, DEFAULT_CURRENCY,
};

/// Values sheets under a minimum-price floor.
///
/// Resolved values strictly below `min_price` count as zero; a value equal to
/// the threshold is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetValuator {
    min_price: Decimal,
}

/// Sheet valuation plus the currency actually observed on a quote, if any.
///
/// `valuation.currency` falls back to USD; `observed_currency` does not, which
/// lets a product pick the first sheet that really exposed a currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOutcome {
    pub valuation: SheetValuation,
    pub observed_currency: Option<String>,
}

impl SheetValuator {
    pub fn new(min_price: Decimal) -> Self {
        Self { min_price }
    }

    /// Apply the minimum-price floor.
    pub fn floor(&self, raw: Decimal) -> Decimal {
        if raw >= self.min_price {
            raw
        } else {
            Decimal::zero()
        }
    }

    pub fn value_sheet(&self, sheet: &Sheet, prices: &impl ResolvePrice) -> SheetValuation {
        self.observe_sheet(sheet, prices).valuation
    }

    pub fn observe_sheet(&self, sheet: &Sheet, prices: &impl ResolvePrice) -> SheetOutcome {
        let total_weight = sheet.total_weight();
        if total_weight == 0 {
            return SheetOutcome {
                valuation: SheetValuation::empty(),
                observed_currency: None,
            };
        }

        let preference = FinishPreference::for_sheet(sheet.foil);
        let mut weighted_sum = Decimal::zero();
        let mut currency: Option<String> = None;

        for (card_id, weight) in &sheet.cards {
            let quote = prices.resolve(card_id, preference);
            // Currency detection is independent of the floor below.
            if currency.is_none() {
                currency = quote.as_ref().and_then(|q| q.currency.clone());
            }
            let raw = quote.map(|q| q.value).unwrap_or_default();
            weighted_sum = accumulate(weighted_sum, Decimal::from(*weight), self.floor(raw));
        }

        // Summing weight * value before the single division keeps the result
        // exact wherever the inputs allow it.
        let ev = weighted_sum
            .checked_div(Decimal::from(total_weight))
            .unwrap_or_default();

        SheetOutcome {
            valuation: SheetValuation {
                ev,
                currency: currency
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                total_weight,
                card_count: sheet.cards.len(),
            },
            observed_currency: currency,
        }
    }

    /// Per-card share of the sheet EV, largest first (ties by card id).
    pub fn card_contributions(
        &self,
        sheet_name: &str,
        sheet: &Sheet,
        prices: &impl ResolvePrice,
        cards: &CardIndex,
    ) -> Vec<CardContribution> {
        let total_weight = sheet.total_weight();
        if total_weight == 0 {
            return Vec::new();
        }
        let total = Decimal::from(total_weight);
        let preference = FinishPreference::for_sheet(sheet.foil);

        let mut rows: Vec<CardContribution> = sheet
            .cards
            .iter()
            .map(|(card_id, weight)| {
                let raw = prices
                    .resolve(card_id, preference)
                    .map(|q| q.value)
                    .unwrap_or_default();
                let value = self.floor(raw);
                let weight = Decimal::from(*weight);
                let card = cards.get(card_id);
                CardContribution {
                    card_id: card_id.clone(),
                    name: card.map(|c| c.name.clone()),
                    rarity: card.and_then(|c| c.rarity.clone()),
                    sheet: sheet_name.to_string(),
                    value,
                    probability: weight.checked_div(total).unwrap_or_default(),
                    contribution: value
                        .checked_mul(weight)
                        .and_then(|v| v.checked_div(total))
                        .unwrap_or_default(),
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.contribution
                .cmp(&a.contribution)
                .then_with(|| a.card_id.cmp(&b.card_id))
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Card, CardId, Finish, Medium, Quote, Vendor};
    use std::collections::HashMap;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn quote(value: &str, currency: Option<&str>) -> Quote {
        Quote {
            value: d(value),
            currency: currency.map(str::to_string),
            medium: Medium::Paper,
            vendor: Vendor::Tcgplayer,
            finish: Finish::Normal,
            date: "2024-05-01".to_string(),
        }
    }

    fn fixed_prices(
        prices: &[(&str, &str, Option<&str>)],
    ) -> impl Fn(&CardId, FinishPreference) -> Option<Quote> {
        let map: HashMap<CardId, Quote> = prices
            .iter()
            .map(|(id, value, currency)| (CardId::from(*id), quote(value, *currency)))
            .collect();
        move |id: &CardId, _pref: FinishPreference| map.get(id).cloned()
    }

    fn sheet(cards: &[(&str, u64)], foil: bool) -> Sheet {
        Sheet {
            cards: cards.iter().map(|(id, w)| (CardId::from(*id), *w)).collect(),
            foil,
            ..Default::default()
        }
    }

    #[test]
    fn test_uniform_sheet_ev() {
        let prices = fixed_prices(&[
            ("A", "0.10", Some("USD")),
            ("B", "0.15", Some("USD")),
            ("C", "0.05", Some("USD")),
        ]);
        let valuation = SheetValuator::default()
            .value_sheet(&sheet(&[("A", 1), ("B", 1), ("C", 1)], false), &prices);
        assert_eq!(valuation.ev, d("0.10"));
        assert_eq!(valuation.total_weight, 3);
        assert_eq!(valuation.card_count, 3);
        assert_eq!(valuation.currency, "USD");
    }

    #[test]
    fn test_empty_sheet() {
        let prices = fixed_prices(&[]);
        let valuation = SheetValuator::default().value_sheet(&Sheet::default(), &prices);
        assert_eq!(valuation, SheetValuation::empty());
    }

    #[test]
    fn test_explicit_zero_total_weight_contributes_nothing() {
        let prices = fixed_prices(&[("A", "5", Some("EUR"))]);
        let mut s = sheet(&[("A", 1)], false);
        s.total_weight = Some(0);
        let valuation = SheetValuator::default().value_sheet(&s, &prices);
        assert!(valuation.ev.is_zero());
        assert_eq!(valuation.card_count, 0);
        assert_eq!(valuation.currency, "USD");
    }

    #[test]
    fn test_min_price_threshold_is_inclusive() {
        let prices = fixed_prices(&[("A", "0.50", None), ("B", "0.49", None)]);
        let valuator = SheetValuator::new(d("0.50"));
        let valuation = valuator.value_sheet(&sheet(&[("A", 1), ("B", 1)], false), &prices);
        assert_eq!(valuation.ev, d("0.25"));
    }

    #[test]
    fn test_currency_detected_even_when_value_floored() {
        let prices = fixed_prices(&[("A", "0.01", Some("EUR")), ("B", "3.00", Some("USD"))]);
        let valuation = SheetValuator::new(d("1"))
            .value_sheet(&sheet(&[("A", 1), ("B", 1)], false), &prices);
        assert_eq!(valuation.currency, "EUR");
        assert_eq!(valuation.ev, d("1.5"));
    }

    #[test]
    fn test_missing_prices_count_as_zero() {
        let prices = fixed_prices(&[("A", "4", None)]);
        let valuation =
            SheetValuator::default().value_sheet(&sheet(&[("A", 1), ("B", 3)], false), &prices);
        assert_eq!(valuation.ev, d("1"));
        assert_eq!(valuation.currency, "USD");
    }

    #[test]
    fn test_foil_sheet_requests_foil_prices() {
        let prices = |_: &CardId, pref: FinishPreference| {
            (pref == FinishPreference::ForceFoil).then(|| quote("2", Some("USD")))
        };
        let valuator = SheetValuator::default();
        assert_eq!(valuator.value_sheet(&sheet(&[("A", 1)], true), &prices).ev, d("2"));
        assert!(valuator.value_sheet(&sheet(&[("A", 1)], false), &prices).ev.is_zero());
    }

    #[test]
    fn test_ev_is_non_negative_for_non_negative_prices() {
        let prices = fixed_prices(&[("A", "0", None), ("B", "12.34", None), ("C", "0.01", None)]);
        let valuation = SheetValuator::default()
            .value_sheet(&sheet(&[("A", 7), ("B", 1), ("C", 13)], false), &prices);
        assert!(valuation.ev >= Decimal::zero());
    }

    #[test]
    fn test_negative_total_weight_contributes_nothing() {
        let prices = fixed_prices(&[("A", "5", Some("EUR"))]);
        let s: Sheet =
            serde_json::from_str(r#"{"cards": {"A": 1}, "totalWeight": -1}"#).unwrap();
        let valuation = SheetValuator::default().value_sheet(&s, &prices);
        assert_eq!(valuation, SheetValuation::empty());
    }

    #[test]
    fn test_overflowing_card_contributes_zero() {
        let prices = fixed_prices(&[("A", "10000000000", None), ("B", "2", None)]);
        let mut s = sheet(&[("A", 10_000_000_000_000_000_000), ("B", 1)], false);
        s.total_weight = Some(2);
        let valuation = SheetValuator::default().value_sheet(&s, &prices);
        assert_eq!(valuation.ev, d("1"));

        let rows = SheetValuator::default().card_contributions(
            "main",
            &s,
            &prices,
            &CardIndex::default(),
        );
        assert_eq!(rows[0].card_id, CardId::from("B"));
        assert!(rows[1].contribution.is_zero());
    }

    #[test]
    fn test_card_contributions_sorted_and_named() {
        let prices = fixed_prices(&[("A", "1", None), ("B", "10", None), ("C", "1", None)]);
        let cards = CardIndex::new(vec![Card {
            uuid: CardId::from("B"),
            set_code: None,
            name: "Mythic Thing".to_string(),
            rarity: Some("mythic".to_string()),
            number: None,
            types: vec![],
            mana_value: None,
        }]);
        let rows = SheetValuator::default().card_contributions(
            "rare",
            &sheet(&[("A", 1), ("B", 1), ("C", 2)], false),
            &prices,
            &cards,
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].card_id, CardId::from("B"));
        assert_eq!(rows[0].name.as_deref(), Some("Mythic Thing"));
        assert_eq!(rows[0].contribution, d("2.5"));
        assert_eq!(rows[0].probability, d("0.25"));
        assert_eq!(rows[1].card_id, CardId::from("C"));
        assert_eq!(rows[2].card_id, CardId::from("A"));
        let total: Decimal = rows.iter().map(|r| r.contribution).sum();
        assert_eq!(total, d("3.25"));
    }
}
