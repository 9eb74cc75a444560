#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use billing_core::{
    CoreError, FixedClock, LedgerPersistence, PatientDirectory, PersistedBill, PriceCatalogSource,
    ReceiptPolicy, ReceiptPrinter,
};
use billing_domain::{
    Bill, BillItem, BillPayment, BillStatus, Patient, Price, PriceGroup, PriceList, PricesOthers,
    RecordId, UNSAVED_ID,
};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use patient_billing::{BillEditor, EditorServices, SessionSettings};
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Wall-clock instant every editor test runs at.
pub static NOW: Lazy<NaiveDateTime> = Lazy::new(|| at(14, 11));

pub static LISTS: Lazy<Vec<PriceList>> =
    Lazy::new(|| vec![PriceList::new(1, "Standard"), PriceList::new(2, "Insured")]);

pub static PRICES: Lazy<Vec<Price>> = Lazy::new(|| {
    vec![
        Price::new(1, PriceGroup::Medical, "12", "Amoxicillin", dec!(10.00)),
        Price::new(1, PriceGroup::Exam, "7", "X-ray", dec!(30.00)),
        Price::new(1, PriceGroup::Other, "1", "Bed day", dec!(20.00)),
        Price::new(2, PriceGroup::Medical, "12", "Amoxicillin", dec!(8.00)),
    ]
});

pub static OTHERS: Lazy<Vec<PricesOthers>> = Lazy::new(|| {
    vec![PricesOthers {
        daily: true,
        ..PricesOthers::new(1, "Bed day")
    }]
});

pub fn temp_root() -> std::path::PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub struct StaticCatalog {
    pub available: bool,
}

impl PriceCatalogSource for StaticCatalog {
    fn get_prices(&self) -> Result<Vec<Price>, CoreError> {
        self.guard()?;
        Ok(PRICES.clone())
    }

    fn get_lists(&self) -> Result<Vec<PriceList>, CoreError> {
        self.guard()?;
        Ok(LISTS.clone())
    }

    fn get_others(&self) -> Result<Vec<PricesOthers>, CoreError> {
        self.guard()?;
        Ok(OTHERS.clone())
    }
}

impl StaticCatalog {
    fn guard(&self) -> Result<(), CoreError> {
        if self.available {
            Ok(())
        } else {
            Err(CoreError::CatalogUnavailable("catalog service offline".into()))
        }
    }
}

#[derive(Default)]
pub struct MemoryState {
    pub bills: BTreeMap<RecordId, PersistedBill>,
    pub next_id: RecordId,
    pub fail_writes: bool,
    pub writes: usize,
}

/// In-memory persistence shared with the test through `state`.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    pub state: Arc<Mutex<MemoryState>>,
}

impl MemoryPersistence {
    fn store(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError> {
        let mut state = self.state.lock().expect("lock memory state");
        if state.fail_writes {
            return Err(CoreError::Persistence("database unreachable".into()));
        }
        let mut next = || {
            state.next_id += 1;
            state.next_id
        };
        let mut bill = bill.clone();
        if bill.id == UNSAVED_ID {
            bill.id = next();
        }
        let items = items
            .iter()
            .cloned()
            .map(|mut item| {
                if item.id == UNSAVED_ID {
                    item.id = next();
                }
                item.bill_id = bill.id;
                item
            })
            .collect();
        let payments = payments
            .iter()
            .cloned()
            .map(|mut payment| {
                if payment.id == UNSAVED_ID {
                    payment.id = next();
                }
                payment.bill_id = bill.id;
                payment
            })
            .collect();
        let persisted = PersistedBill {
            bill,
            items,
            payments,
        };
        state.writes += 1;
        state.bills.insert(persisted.bill.id, persisted.clone());
        Ok(persisted)
    }
}

impl LedgerPersistence for MemoryPersistence {
    fn create_bill(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError> {
        self.store(bill, items, payments)
    }

    fn update_bill(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError> {
        self.store(bill, items, payments)
    }

    fn load_bill(&self, id: RecordId) -> Result<PersistedBill, CoreError> {
        self.state
            .lock()
            .expect("lock memory state")
            .bills
            .get(&id)
            .cloned()
            .ok_or(CoreError::BillNotFound(id))
    }
}

/// Patient registry whose pending bills are derived from the shared memory store.
#[derive(Clone)]
pub struct MemoryPatients {
    pub patients: Vec<Patient>,
    pub store: MemoryPersistence,
}

impl PatientDirectory for MemoryPatients {
    fn find_patient_by_id(&self, id: RecordId) -> Result<Option<Patient>, CoreError> {
        Ok(self.patients.iter().find(|patient| patient.id == id).cloned())
    }

    fn pending_bills(&self, patient_id: RecordId) -> Result<Vec<RecordId>, CoreError> {
        let state = self.store.state.lock().expect("lock memory state");
        Ok(state
            .bills
            .values()
            .filter(|stored| {
                stored.bill.patient_id == Some(patient_id)
                    && stored.bill.status == BillStatus::Open
            })
            .map(|stored| stored.bill.id)
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct RecordingPrinter {
    pub printed: Arc<Mutex<Vec<String>>>,
}

impl ReceiptPrinter for RecordingPrinter {
    fn print_payments(&self, bill: &Bill, payments: &[BillPayment]) -> Result<(), CoreError> {
        self.printed
            .lock()
            .expect("lock printer log")
            .push(format!("payments:{}:{}", bill.id, payments.len()));
        Ok(())
    }

    fn print_bill(&self, bill: &Bill) -> Result<(), CoreError> {
        self.printed
            .lock()
            .expect("lock printer log")
            .push(format!("bill:{}", bill.id));
        Ok(())
    }
}

/// Handles a test keeps on the collaborators it handed to the editor.
pub struct Harness {
    pub editor: BillEditor,
    pub store: MemoryPersistence,
    pub printer: RecordingPrinter,
}

pub fn harness() -> Harness {
    harness_with(true, SessionSettings::default())
}

pub fn printing_harness() -> Harness {
    let settings = SessionSettings {
        receipts: ReceiptPolicy {
            receipt_printer: true,
            print_as_paid: true,
        },
        ..SessionSettings::default()
    };
    harness_with(true, settings)
}

pub fn harness_with(catalog_available: bool, settings: SessionSettings) -> Harness {
    let store = MemoryPersistence::default();
    let printer = RecordingPrinter::default();
    let services = EditorServices {
        catalog: Box::new(StaticCatalog {
            available: catalog_available,
        }),
        persistence: Box::new(store.clone()),
        patients: Box::new(MemoryPatients {
            patients: vec![Patient::new(3, "Ada Obi")],
            store: store.clone(),
        }),
        printer: Some(Box::new(printer.clone())),
        clock: Box::new(FixedClock(*NOW)),
    };
    Harness {
        editor: BillEditor::new(services, settings),
        store,
        printer,
    }
}
