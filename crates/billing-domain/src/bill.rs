//! Domain model for a patient bill header.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{common::*, patient::Patient, price::PriceList};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: RecordId,
    pub date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<NaiveDateTime>,
    pub uses_price_list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_list_id: Option<RecordId>,
    #[serde(default)]
    pub price_list_name: String,
    pub has_patient: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<RecordId>,
    #[serde(default)]
    pub patient_name: String,
    pub status: BillStatus,
    pub total: Decimal,
    pub balance: Decimal,
    pub user: String,
}

impl Bill {
    pub fn new(date: NaiveDateTime, user: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            date,
            last_payment_date: None,
            uses_price_list: true,
            price_list_id: None,
            price_list_name: String::new(),
            has_patient: false,
            patient_id: None,
            patient_name: String::new(),
            status: BillStatus::Open,
            total: Decimal::ZERO,
            balance: Decimal::ZERO,
            user: user.into(),
        }
    }

    pub fn with_price_list(mut self, list: &PriceList) -> Self {
        self.assign_price_list(list);
        self
    }

    pub fn with_patient(mut self, patient: &Patient) -> Self {
        self.assign_patient(patient);
        self
    }

    /// Points the bill at `list` and refreshes the denormalized list name.
    pub fn assign_price_list(&mut self, list: &PriceList) {
        self.uses_price_list = true;
        self.price_list_id = Some(list.id);
        self.price_list_name = list.name.clone();
    }

    pub fn assign_patient(&mut self, patient: &Patient) {
        self.has_patient = true;
        self.patient_id = Some(patient.id);
        self.patient_name = patient.name.clone();
    }

    /// Drops the patient association, keeping `payer_name` as free-text display name.
    pub fn detach_patient(&mut self, payer_name: impl Into<String>) {
        self.has_patient = false;
        self.patient_id = None;
        self.patient_name = payer_name.into();
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.status, BillStatus::Closed)
    }
}

impl Identifiable for Bill {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Displayable for Bill {
    fn display_label(&self) -> String {
        format!("bill:{} [{}] {}", self.id, self.status, self.patient_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Lifecycle state of a bill.
pub enum BillStatus {
    #[default]
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "C")]
    Closed,
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BillStatus::Open => "Open",
            BillStatus::Closed => "Closed",
        };
        f.write_str(label)
    }
}
