//! Domain model for payments and refunds recorded against a bill.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillPayment {
    pub id: RecordId,
    pub bill_id: RecordId,
    pub date: NaiveDateTime,
    /// Negative amounts are refunds.
    pub amount: Decimal,
    pub user: String,
}

impl BillPayment {
    pub fn new(date: NaiveDateTime, amount: Decimal, user: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            bill_id: UNSAVED_ID,
            date,
            amount,
            user: user.into(),
        }
    }

    pub fn is_refund(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl Identifiable for BillPayment {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Amounted for BillPayment {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

impl Displayable for BillPayment {
    fn display_label(&self) -> String {
        format!("{} {}", self.date.format("%d/%m/%Y - %H:%M:%S"), self.amount)
    }
}
