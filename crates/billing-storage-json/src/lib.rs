use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use billing_core::{
    CoreError, LedgerPersistence, PatientDirectory, PersistedBill, PriceCatalogSource,
};
use billing_domain::{
    Bill, BillItem, BillPayment, BillStatus, Patient, Price, PriceList, PricesOthers, RecordId,
    UNSAVED_ID,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const DOCUMENT_EXTENSION: &str = "json";
const BILL_PREFIX: &str = "bill-";
const SEQUENCE_FILE: &str = "sequence.json";
const TMP_SUFFIX: &str = "tmp";

/// On-disk layout: one document per bill plus the id sequence.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub bills_root: PathBuf,
}

impl StoragePaths {
    pub fn under(data_root: &Path) -> Self {
        Self {
            bills_root: data_root.join("bills"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BillDocument {
    bill: Bill,
    #[serde(default)]
    items: Vec<BillItem>,
    #[serde(default)]
    payments: Vec<BillPayment>,
}

impl From<BillDocument> for PersistedBill {
    fn from(doc: BillDocument) -> Self {
        PersistedBill {
            bill: doc.bill,
            items: doc.items,
            payments: doc.payments,
        }
    }
}

/// Last ids handed out, per record family.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Sequence {
    bill: RecordId,
    item: RecordId,
    payment: RecordId,
}

impl Sequence {
    fn next(slot: &mut RecordId) -> RecordId {
        *slot += 1;
        *slot
    }
}

/// Filesystem-backed JSON persistence for bills.
///
/// Each commit rewrites the whole bill document through a temp file and a rename, so a reader
/// sees either the previous or the new state of a bill.
#[derive(Debug, Clone)]
pub struct JsonBillStorage {
    bills_dir: PathBuf,
}

impl JsonBillStorage {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.bills_root)?;
        Ok(Self {
            bills_dir: paths.bills_root,
        })
    }

    pub fn bill_path(&self, id: RecordId) -> PathBuf {
        self.bills_dir
            .join(format!("{BILL_PREFIX}{id}.{DOCUMENT_EXTENSION}"))
    }

    /// Ids of every stored bill, ascending.
    pub fn list_bills(&self) -> Result<Vec<RecordId>, CoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.bills_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.strip_prefix(BILL_PREFIX))
                .and_then(|raw| raw.parse::<RecordId>().ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Open bills associated with `patient_id`.
    pub fn open_bills_for_patient(&self, patient_id: RecordId) -> Result<Vec<RecordId>, CoreError> {
        let mut open = Vec::new();
        for id in self.list_bills()? {
            let doc: BillDocument = read_document(&self.bill_path(id))?;
            let bill = &doc.bill;
            if bill.has_patient
                && bill.patient_id == Some(patient_id)
                && bill.status == BillStatus::Open
            {
                open.push(id);
            }
        }
        Ok(open)
    }

    fn sequence_path(&self) -> PathBuf {
        self.bills_dir.join(SEQUENCE_FILE)
    }

    fn load_sequence(&self) -> Result<Sequence, CoreError> {
        let path = self.sequence_path();
        if !path.exists() {
            return Ok(Sequence::default());
        }
        read_document(&path)
    }

    /// Assigns ids to every unsaved row and writes the bill document.
    fn commit(
        &self,
        mut bill: Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError> {
        let mut sequence = self.load_sequence()?;
        if bill.id == UNSAVED_ID {
            bill.id = Sequence::next(&mut sequence.bill);
        }
        let items = items
            .iter()
            .cloned()
            .map(|mut item| {
                if item.id == UNSAVED_ID {
                    item.id = Sequence::next(&mut sequence.item);
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
                    payment.id = Sequence::next(&mut sequence.payment);
                }
                payment.bill_id = bill.id;
                payment
            })
            .collect();

        // Ids burnt by a failed bill write leave harmless gaps.
        write_document(&self.sequence_path(), &sequence)?;
        let doc = BillDocument {
            bill,
            items,
            payments,
        };
        write_document(&self.bill_path(doc.bill.id), &doc)?;
        Ok(doc.into())
    }
}

impl LedgerPersistence for JsonBillStorage {
    fn create_bill(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError> {
        if bill.id != UNSAVED_ID {
            return Err(CoreError::InvalidOperation(format!(
                "bill {} is already persisted",
                bill.id
            )));
        }
        self.commit(bill.clone(), items, payments)
    }

    fn update_bill(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError> {
        if bill.id == UNSAVED_ID || !self.bill_path(bill.id).exists() {
            return Err(CoreError::BillNotFound(bill.id));
        }
        self.commit(bill.clone(), items, payments)
    }

    fn load_bill(&self, id: RecordId) -> Result<PersistedBill, CoreError> {
        let path = self.bill_path(id);
        if !path.exists() {
            return Err(CoreError::BillNotFound(id));
        }
        let doc: BillDocument = read_document(&path)?;
        Ok(doc.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub lists: Vec<PriceList>,
    #[serde(default)]
    pub prices: Vec<Price>,
    #[serde(default)]
    pub others: Vec<PricesOthers>,
}

/// Price catalog read from a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, catalog: &CatalogDocument) -> Result<(), CoreError> {
        write_document(&self.path, catalog)
    }

    fn read(&self) -> Result<CatalogDocument, CoreError> {
        read_document(&self.path).map_err(|err| {
            CoreError::CatalogUnavailable(format!("{}: {err}", self.path.display()))
        })
    }
}

impl PriceCatalogSource for JsonCatalogSource {
    fn get_prices(&self) -> Result<Vec<Price>, CoreError> {
        Ok(self.read()?.prices)
    }

    fn get_lists(&self) -> Result<Vec<PriceList>, CoreError> {
        Ok(self.read()?.lists)
    }

    fn get_others(&self) -> Result<Vec<PricesOthers>, CoreError> {
        Ok(self.read()?.others)
    }
}

/// Patient registry document paired with the bill store for pending-bill queries.
#[derive(Debug, Clone)]
pub struct JsonPatientDirectory {
    path: PathBuf,
    bills: JsonBillStorage,
}

impl JsonPatientDirectory {
    pub fn new(path: impl Into<PathBuf>, bills: JsonBillStorage) -> Self {
        Self {
            path: path.into(),
            bills,
        }
    }

    pub fn save(&self, patients: &[Patient]) -> Result<(), CoreError> {
        write_document(&self.path, patients)
    }

    fn patients(&self) -> Result<Vec<Patient>, CoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_document(&self.path)
    }
}

impl PatientDirectory for JsonPatientDirectory {
    fn find_patient_by_id(&self, id: RecordId) -> Result<Option<Patient>, CoreError> {
        Ok(self
            .patients()?
            .into_iter()
            .find(|patient| patient.id == id))
    }

    fn pending_bills(&self, patient_id: RecordId) -> Result<Vec<RecordId>, CoreError> {
        self.bills.open_bills_for_patient(patient_id)
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let data =
        serde_json::to_string_pretty(value).map_err(|err| CoreError::Serde(err.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
