//! Card identity records and the per-set identity index.

use super::{CardId, Decimal, SetCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A printed card. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub uuid: CardId,
    #[serde(default)]
    pub set_code: Option<SetCode>,
    pub name: String,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub mana_value: Option<Decimal>,
}

/// Card id -> card, owned by whoever loaded the set.
#[derive(Debug, Clone, Default)]
pub struct CardIndex {
    cards: HashMap<CardId, Card>,
}

impl CardIndex {
    pub fn new(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().map(|c| (c.uuid.clone(), c)).collect(),
        }
    }

    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
