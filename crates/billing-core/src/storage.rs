use billing_domain::{Bill, BillItem, BillPayment, RecordId};

use crate::CoreError;

/// A bill with its rows as confirmed by the persistence service, ids assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedBill {
    pub bill: Bill,
    pub items: Vec<BillItem>,
    pub payments: Vec<BillPayment>,
}

/// Abstraction over persistence backends able to commit a bill and its rows atomically.
pub trait LedgerPersistence: Send + Sync {
    /// Stores a never-saved bill. Every row receives an id.
    fn create_bill(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError>;

    /// Replaces the stored state of an existing bill with the supplied rows.
    fn update_bill(
        &self,
        bill: &Bill,
        items: &[BillItem],
        payments: &[BillPayment],
    ) -> Result<PersistedBill, CoreError>;

    fn load_bill(&self, id: RecordId) -> Result<PersistedBill, CoreError>;
}
