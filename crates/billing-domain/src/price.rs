//! Price catalog models: price lists, their prices, and "other" charge definitions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::*;

/// A named set of catalog prices a bill can be billed against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceList {
    pub id: RecordId,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PriceList {
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            code: String::new(),
            name: name.into(),
            description: String::new(),
        }
    }
}

impl Identifiable for PriceList {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// A priced catalog entry belonging to one price list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Price {
    pub list_id: RecordId,
    pub group: PriceGroup,
    pub item_code: String,
    pub description: String,
    pub amount: Decimal,
}

impl Price {
    pub fn new(
        list_id: RecordId,
        group: PriceGroup,
        item_code: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            list_id,
            group,
            item_code: item_code.into(),
            description: description.into(),
            amount,
        }
    }

    pub fn key(&self) -> PriceKey {
        PriceKey::new(self.group, self.item_code.clone())
    }
}

/// Describes how an `OTH` catalog entry must be charged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricesOthers {
    pub id: RecordId,
    #[serde(default)]
    pub code: String,
    pub description: String,
    /// The amount is asked for when the line is added.
    #[serde(default)]
    pub undefined: bool,
    /// The amount is credited (sign flipped).
    #[serde(default)]
    pub discharge: bool,
    /// The quantity is the number of days.
    #[serde(default)]
    pub daily: bool,
}

impl PricesOthers {
    pub fn new(id: RecordId, description: impl Into<String>) -> Self {
        Self {
            id,
            code: String::new(),
            description: description.into(),
            undefined: false,
            discharge: false,
            daily: false,
        }
    }
}

impl Identifiable for PricesOthers {
    fn id(&self) -> RecordId {
        self.id
    }
}
