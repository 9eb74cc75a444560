//! Shared traits, identifiers, and enums for billing primitives.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the persistence service. `0` marks a row that was never saved.
pub type RecordId = u64;

/// Sentinel identifier carried by bills, items, and payments before their first commit.
pub const UNSAVED_ID: RecordId = 0;

/// Exposes a stable identifier for entities stored by the persistence service.
pub trait Identifiable {
    fn id(&self) -> RecordId;

    /// Returns `true` once the persistence service has assigned an identifier.
    fn is_persisted(&self) -> bool {
        self.id() != UNSAVED_ID
    }
}

/// Supplies a common contract for retrieving signed monetary amounts.
pub trait Amounted {
    fn amount(&self) -> Decimal;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Catalog categories a price can belong to.
pub enum PriceGroup {
    #[serde(rename = "MED")]
    Medical,
    #[serde(rename = "OPE")]
    Operation,
    #[serde(rename = "EXA")]
    Exam,
    #[serde(rename = "OTH")]
    Other,
}

impl PriceGroup {
    /// Three-letter code used in priced-item keys.
    pub fn code(self) -> &'static str {
        match self {
            PriceGroup::Medical => "MED",
            PriceGroup::Operation => "OPE",
            PriceGroup::Exam => "EXA",
            PriceGroup::Other => "OTH",
        }
    }
}

impl fmt::Display for PriceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriceGroup::Medical => "Medical",
            PriceGroup::Operation => "Operation",
            PriceGroup::Exam => "Exam",
            PriceGroup::Other => "Other",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raised when a category code is not one of `MED`, `OPE`, `EXA`, `OTH`.
pub struct UnknownPriceGroup(pub String);

impl fmt::Display for UnknownPriceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown price group `{}`", self.0)
    }
}

impl std::error::Error for UnknownPriceGroup {}

impl FromStr for PriceGroup {
    type Err = UnknownPriceGroup;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MED" => Ok(PriceGroup::Medical),
            "OPE" => Ok(PriceGroup::Operation),
            "EXA" => Ok(PriceGroup::Exam),
            "OTH" => Ok(PriceGroup::Other),
            other => Err(UnknownPriceGroup(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifies a catalog price inside a price list by category and item code.
pub struct PriceKey {
    pub group: PriceGroup,
    pub item_code: String,
}

impl PriceKey {
    pub fn new(group: PriceGroup, item_code: impl Into<String>) -> Self {
        Self {
            group,
            item_code: item_code.into(),
        }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.group.code(), self.item_code)
    }
}
