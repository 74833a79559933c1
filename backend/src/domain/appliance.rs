//! Appliance catalog entities.
//!
//! The catalog is seeded once from configuration and read-mostly after
//! that; appliances are never renamed or retyped while bookings exist.

use serde::{Deserialize, Serialize};

/// Opaque appliance identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplianceId(i64);

impl ApplianceId {
    /// Wrap a raw store identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw store identifier.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ApplianceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two appliance kinds the house operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplianceKind {
    /// Washing machine.
    Wash,
    /// Dryer.
    Dry,
}

impl ApplianceKind {
    /// Stable textual representation used in storage and messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wash => "wash",
            Self::Dry => "dry",
        }
    }

    /// Parse the stored textual representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wash" => Some(Self::Wash),
            "dry" => Some(Self::Dry),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApplianceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appliance in the shared laundry room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appliance {
    /// Store-assigned identifier.
    pub id: ApplianceId,
    /// Whether this is a washer or a dryer.
    pub kind: ApplianceKind,
    /// Unique human-facing name, e.g. "Washer #3".
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_repr() {
        for kind in [ApplianceKind::Wash, ApplianceKind::Dry] {
            assert_eq!(ApplianceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ApplianceKind::parse("spin"), None);
    }
}
