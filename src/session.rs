use std::path::Path;

use billing_config::Config;
use billing_core::{
    Clock, LedgerPersistence, PatientDirectory, PriceCatalogSource, ReceiptPolicy,
    ReceiptPrinter, SystemClock,
};
use billing_storage_json::{JsonBillStorage, JsonCatalogSource, JsonPatientDirectory, StoragePaths};
use chrono::NaiveDateTime;

use crate::errors::BillingError;

/// Configuration snapshot a bill editing session runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub currency: String,
    pub currency_scale: u32,
    pub user: String,
    pub allow_multiple_open_bills: bool,
    pub receipts: ReceiptPolicy,
    pub last_bill_date: Option<NaiveDateTime>,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            currency: config.currency.clone(),
            currency_scale: config.currency_scale,
            user: config.operator(),
            allow_multiple_open_bills: config.allow_multiple_open_bills,
            receipts: ReceiptPolicy {
                receipt_printer: config.receipt_printer,
                print_as_paid: config.print_as_paid,
            },
            last_bill_date: config.last_bill_date,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// External collaborators consumed by the editor.
pub struct EditorServices {
    pub catalog: Box<dyn PriceCatalogSource>,
    pub persistence: Box<dyn LedgerPersistence>,
    pub patients: Box<dyn PatientDirectory>,
    pub printer: Option<Box<dyn ReceiptPrinter>>,
    pub clock: Box<dyn Clock>,
}

impl EditorServices {
    /// JSON-file collaborators rooted at `data_root`: `bills/`, `catalog.json`, `patients.json`.
    pub fn json(data_root: &Path) -> Result<Self, BillingError> {
        let bills = JsonBillStorage::new(StoragePaths::under(data_root))?;
        Ok(Self {
            catalog: Box::new(JsonCatalogSource::new(data_root.join("catalog.json"))),
            patients: Box::new(JsonPatientDirectory::new(
                data_root.join("patients.json"),
                bills.clone(),
            )),
            persistence: Box::new(bills),
            printer: None,
            clock: Box::new(SystemClock),
        })
    }

    /// JSON collaborators under the data root named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, BillingError> {
        Self::json(&config.resolve_data_root())
    }

    pub fn with_printer(mut self, printer: Box<dyn ReceiptPrinter>) -> Self {
        self.printer = Some(printer);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
