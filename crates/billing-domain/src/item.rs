//! Domain model for bill line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{common::*, price::Price};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillItem {
    pub id: RecordId,
    pub bill_id: RecordId,
    /// `true` when description and amount follow the active price list.
    pub from_catalog: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_key: Option<PriceKey>,
    pub description: String,
    pub unit_amount: Decimal,
    pub quantity: u32,
}

impl BillItem {
    /// Builds a line bound to a catalog price.
    pub fn from_price(price: &Price, quantity: u32) -> Self {
        Self {
            id: UNSAVED_ID,
            bill_id: UNSAVED_ID,
            from_catalog: true,
            price_key: Some(price.key()),
            description: price.description.clone(),
            unit_amount: price.amount,
            quantity,
        }
    }

    /// Builds a free-form line whose amount is not tied to any price list.
    pub fn custom(description: impl Into<String>, unit_amount: Decimal) -> Self {
        Self {
            id: UNSAVED_ID,
            bill_id: UNSAVED_ID,
            from_catalog: false,
            price_key: None,
            description: description.into(),
            unit_amount,
            quantity: 1,
        }
    }

    /// Unit amount multiplied by quantity.
    pub fn line_total(&self) -> Decimal {
        self.unit_amount * Decimal::from(self.quantity)
    }

    /// Exact unit amount times quantity, or `None` when the product does not fit at the
    /// unit amount's scale.
    pub fn checked_line_total(&self) -> Option<Decimal> {
        let total = self.unit_amount.checked_mul(Decimal::from(self.quantity))?;
        (total.scale() >= self.unit_amount.scale()).then_some(total)
    }

    pub fn is_credit(&self) -> bool {
        self.unit_amount.is_sign_negative() && !self.unit_amount.is_zero()
    }

    /// Returns a copy carrying `price`'s description and amount.
    pub fn repriced(&self, price: &Price) -> Self {
        Self {
            description: price.description.clone(),
            unit_amount: price.amount,
            ..self.clone()
        }
    }
}

impl Identifiable for BillItem {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Amounted for BillItem {
    fn amount(&self) -> Decimal {
        self.line_total()
    }
}

impl Displayable for BillItem {
    fn display_label(&self) -> String {
        format!("{} x{} @ {}", self.description, self.quantity, self.unit_amount)
    }
}
