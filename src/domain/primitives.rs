//! Domain primitives: identifiers, time, and the price-feed enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Offset this instant by a duration, saturating on overflow.
    pub fn saturating_add(&self, duration: std::time::Duration) -> Self {
        let ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        TimeMs(self.0.saturating_add(ms))
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

string_id!(
    /// Card or sealed-product identifier (uuid) as used by the price table.
    CardId
);

string_id!(
    /// Set code (e.g. "MKM"). Stored as published; lookups upper-case it.
    SetCode
);

string_id!(
    /// Booster product type within a set (e.g. "play", "draft", "collector").
    ProductType
);

impl SetCode {
    /// Canonical upper-case form used for cache keys and document names.
    pub fn canonical(&self) -> SetCode {
        SetCode(self.0.trim().to_ascii_uppercase())
    }
}

/// Where a card is sold: physical cards or the online client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Paper,
    Mtgo,
}

impl Medium {
    /// Scan order used by the price resolver.
    pub const SCAN_ORDER: [Medium; 2] = [Medium::Paper, Medium::Mtgo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Paper => "paper",
            Medium::Mtgo => "mtgo",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Cardmarket,
    Tcgplayer,
    Cardkingdom,
    Manapool,
}

impl Vendor {
    /// Priority order used by the price resolver: the first vendor with a price wins.
    pub const SCAN_ORDER: [Vendor; 4] = [
        Vendor::Cardmarket,
        Vendor::Tcgplayer,
        Vendor::Cardkingdom,
        Vendor::Manapool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Cardmarket => "cardmarket",
            Vendor::Tcgplayer => "tcgplayer",
            Vendor::Cardkingdom => "cardkingdom",
            Vendor::Manapool => "manapool",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Print treatment of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finish {
    Normal,
    Nonfoil,
    Etched,
    Foil,
}

impl Finish {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finish::Normal => "normal",
            Finish::Nonfoil => "nonfoil",
            Finish::Etched => "etched",
            Finish::Foil => "foil",
        }
    }
}

impl std::str::FromStr for Finish {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Finish::Normal),
            "nonfoil" => Ok(Finish::Nonfoil),
            "etched" => Ok(Finish::Etched),
            "foil" => Ok(Finish::Foil),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Finish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
