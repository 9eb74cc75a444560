//! Patient association and the checks run when an existing bill is reopened.

use billing_domain::{Patient, RecordId};
use tracing::{info, warn};

use crate::{catalog::PriceCatalog, ledger::BillLedger, CoreError};

/// External patient registry.
pub trait PatientDirectory: Send + Sync {
    fn find_patient_by_id(&self, id: RecordId) -> Result<Option<Patient>, CoreError>;
    /// Ids of the patient's bills still in OPEN status.
    fn pending_bills(&self, patient_id: RecordId) -> Result<Vec<RecordId>, CoreError>;
}

pub struct PatientService;

impl PatientService {
    /// Associates `patient` with the bill and returns the patient's other pending bills.
    ///
    /// With `allow_multiple_open` off, any other pending bill refuses the selection.
    pub fn select(
        ledger: &mut BillLedger,
        patient: &Patient,
        directory: &dyn PatientDirectory,
        allow_multiple_open: bool,
    ) -> Result<Vec<RecordId>, CoreError> {
        let own_id = ledger.bill().id;
        let pending: Vec<RecordId> = directory
            .pending_bills(patient.id)?
            .into_iter()
            .filter(|id| *id != own_id)
            .collect();
        if !pending.is_empty() && !allow_multiple_open {
            warn!(patient_id = patient.id, ?pending, "patient already has a pending bill");
            return Err(CoreError::PendingBillExists {
                patient_id: patient.id,
                bills: pending,
            });
        }
        ledger.update_bill(|bill| bill.assign_patient(patient));
        info!(patient_id = patient.id, "patient selected");
        Ok(pending)
    }

    pub fn clear(ledger: &mut BillLedger) {
        ledger.update_bill(|bill| bill.detach_patient(String::new()));
    }

    /// Sets a free-text payer name. Only allowed on bills without an associated patient.
    pub fn set_payer_name(ledger: &mut BillLedger, name: &str) -> Result<(), CoreError> {
        if ledger.bill().has_patient {
            return Err(CoreError::InvalidOperation(
                "payer name is taken from the associated patient".into(),
            ));
        }
        let name = name.trim().to_string();
        ledger.update_bill(|bill| bill.patient_name = name);
        Ok(())
    }
}

/// Repairs dangling references of a reopened bill and describes each repair.
///
/// For bills priced from a list, a list gone from the catalog is replaced by the catalog
/// default. A patient gone from the directory is detached, keeping the stored name as payer
/// name.
pub fn reconcile_references(
    ledger: &mut BillLedger,
    catalog: Option<&PriceCatalog>,
    directory: &dyn PatientDirectory,
) -> Result<Vec<String>, CoreError> {
    let mut warnings = Vec::new();

    if let Some(catalog) = catalog.filter(|_| ledger.bill().uses_price_list) {
        let known = ledger
            .bill()
            .price_list_id
            .and_then(|id| catalog.list(id))
            .is_some();
        if !known {
            if let Some(default) = catalog.default_list() {
                warnings.push(format!(
                    "bill {} references missing price list {:?}; using {}",
                    ledger.bill().id,
                    ledger.bill().price_list_id,
                    default.name
                ));
                let default = default.clone();
                ledger.update_bill(|bill| bill.assign_price_list(&default));
            }
        }
    }

    if let Some(patient_id) = ledger.bill().patient_id.filter(|_| ledger.bill().has_patient) {
        if directory.find_patient_by_id(patient_id)?.is_none() {
            warnings.push(format!(
                "bill {} references missing patient {}; patient detached",
                ledger.bill().id,
                patient_id
            ));
            let payer = ledger.bill().patient_name.clone();
            ledger.update_bill(|bill| bill.detach_patient(payer));
        }
    }

    for warning in &warnings {
        warn!(%warning, "bill reference repaired");
    }
    Ok(warnings)
}
