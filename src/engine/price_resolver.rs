//! Collapses a multi-vendor price record into a single quote.

use crate::domain::{CardId, Finish, Medium, PriceSeries, PriceTable, Quote, Vendor};

/// Which finishes a lookup may consider, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishPreference {
    /// Foil only. No fallback to other finishes.
    ForceFoil,
    /// Normal, nonfoil, etched. Never foil, not even as a last resort.
    ForceNonFoil,
    /// Exactly the given finish.
    ForceFinish(Finish),
    /// Normal, nonfoil, etched, then foil. A vendor that only lists a foil
    /// price will surface it.
    Unconstrained,
}

const FOIL_ONLY: [Finish; 1] = [Finish::Foil];
const NON_FOIL: [Finish; 3] = [Finish::Normal, Finish::Nonfoil, Finish::Etched];
const ANY_FINISH: [Finish; 4] = [Finish::Normal, Finish::Nonfoil, Finish::Etched, Finish::Foil];

impl FinishPreference {
    /// Preference used when valuing a sheet draw.
    pub fn for_sheet(foil: bool) -> Self {
        if foil {
            FinishPreference::ForceFoil
        } else {
            FinishPreference::ForceNonFoil
        }
    }

    /// Eligible finishes in scan order.
    pub fn eligible(&self) -> &[Finish] {
        match self {
            FinishPreference::ForceFoil => &FOIL_ONLY,
            FinishPreference::ForceNonFoil => &NON_FOIL,
            FinishPreference::ForceFinish(finish) => std::slice::from_ref(finish),
            FinishPreference::Unconstrained => &ANY_FINISH,
        }
    }
}

/// Anything that can price a card under a finish preference.
///
/// Implemented by [`PriceResolver`] and by plain closures, so the valuators can
/// be driven from fixed test prices.
pub trait ResolvePrice {
    fn resolve(&self, card_id: &CardId, preference: FinishPreference) -> Option<Quote>;
}

impl<F> ResolvePrice for F
where
    F: Fn(&CardId, FinishPreference) -> Option<Quote>,
{
    fn resolve(&self, card_id: &CardId, preference: FinishPreference) -> Option<Quote> {
        self(card_id, preference)
    }
}

/// Resolves prices from a loaded price snapshot.
///
/// Scan order is medium (paper, mtgo), then vendor (cardmarket, tcgplayer,
/// cardkingdom, manapool), then eligible finish. Each vendor contributes its
/// retail pool when published, otherwise its buylist. The first combination
/// with a value wins; vendors are never averaged or reconciled.
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver<'a> {
    table: &'a PriceTable,
}

impl<'a> PriceResolver<'a> {
    pub fn new(table: &'a PriceTable) -> Self {
        Self { table }
    }

    pub fn resolve(&self, card_id: &CardId, preference: FinishPreference) -> Option<Quote> {
        let entry = self.table.get(card_id)?;

        for medium in Medium::SCAN_ORDER {
            let Some(vendors) = entry.vendors(medium) else {
                continue;
            };
            for vendor in Vendor::SCAN_ORDER {
                let Some(listing) = vendors.get(vendor.as_str()) else {
                    continue;
                };
                let Some(pool) = listing.preferred_pool() else {
                    continue;
                };
                for finish in preference.eligible() {
                    let latest = pool.get(finish.as_str()).and_then(PriceSeries::latest);
                    if let Some((date, value)) = latest {
                        return Some(Quote {
                            value,
                            currency: listing.currency.clone(),
                            medium,
                            vendor,
                            finish: *finish,
                            date: date.to_string(),
                        });
                    }
                }
            }
        }

        None
    }
}

impl ResolvePrice for PriceResolver<'_> {
    fn resolve(&self, card_id: &CardId, preference: FinishPreference) -> Option<Quote> {
        PriceResolver::resolve(self, card_id, preference)
    }
}
