//! In-memory entity graph of one bill: header, ordered items, ordered payments.

use billing_domain::{Bill, BillItem, BillPayment, Displayable, Identifiable};
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::{error::RowKind, CoreError};

/// One bill being edited together with the saved/unsaved boundary of its rows.
///
/// Rows below `saved_item_count` / `saved_payment_count` were persisted before the
/// session started and can never be removed.
#[derive(Debug, Clone)]
pub struct BillLedger {
    bill: Bill,
    items: Vec<BillItem>,
    payments: Vec<BillPayment>,
    saved_item_count: usize,
    saved_payment_count: usize,
    inserting: bool,
    modified: bool,
}

impl BillLedger {
    /// Starts a ledger for a bill that has never been saved (insert mode).
    pub fn new(bill: Bill) -> Self {
        Self {
            bill,
            items: Vec::new(),
            payments: Vec::new(),
            saved_item_count: 0,
            saved_payment_count: 0,
            inserting: true,
            modified: false,
        }
    }

    /// Wraps a persisted bill and its rows (edit mode). Every loaded row is protected.
    pub fn load(bill: Bill, items: Vec<BillItem>, mut payments: Vec<BillPayment>) -> Self {
        payments.sort_by_key(|payment| payment.date);
        Self {
            saved_item_count: items.len(),
            saved_payment_count: payments.len(),
            bill,
            items,
            payments,
            inserting: false,
            modified: false,
        }
    }

    pub fn bill(&self) -> &Bill {
        &self.bill
    }

    pub fn items(&self) -> &[BillItem] {
        &self.items
    }

    pub fn payments(&self) -> &[BillPayment] {
        &self.payments
    }

    pub fn saved_item_count(&self) -> usize {
        self.saved_item_count
    }

    pub fn saved_payment_count(&self) -> usize {
        self.saved_payment_count
    }

    /// `true` while the bill has never been committed.
    pub fn is_inserting(&self) -> bool {
        self.inserting
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Rows appended during this session.
    pub fn new_items(&self) -> &[BillItem] {
        &self.items[self.saved_item_count.min(self.items.len())..]
    }

    pub fn new_payments(&self) -> &[BillPayment] {
        &self.payments[self.saved_payment_count.min(self.payments.len())..]
    }

    pub fn has_new_payments(&self) -> bool {
        (self.inserting && !self.payments.is_empty())
            || self.payments.len() > self.saved_payment_count
    }

    pub fn latest_payment_date(&self) -> Option<NaiveDateTime> {
        self.payments.last().map(|payment| payment.date)
    }

    pub fn earliest_payment_date(&self) -> Option<NaiveDateTime> {
        self.payments.first().map(|payment| payment.date)
    }

    /// Appends `item` at the end and returns its index.
    pub fn append_item(&mut self, mut item: BillItem) -> usize {
        item.bill_id = self.bill.id;
        debug!(item = %item.display_label(), "item appended");
        self.items.push(item);
        self.modified = true;
        self.items.len() - 1
    }

    pub fn remove_item(&mut self, index: usize) -> Result<BillItem, CoreError> {
        self.ensure_removable(RowKind::Item, index, self.items.len(), self.saved_item_count)?;
        let removed = self.items.remove(index);
        self.modified = true;
        debug!(index, item = %removed.display_label(), "item removed");
        Ok(removed)
    }

    /// Appends `payment` and restores chronological order.
    ///
    /// The sort is stable, so a payment dated identically to an existing one lands after it.
    /// Returns the payment's index after sorting.
    pub fn append_payment(&mut self, mut payment: BillPayment) -> usize {
        payment.bill_id = self.bill.id;
        let date = payment.date;
        debug!(payment = %payment.display_label(), refund = payment.is_refund(), "payment appended");
        self.payments.push(payment);
        self.payments.sort_by_key(|payment| payment.date);
        self.modified = true;
        self.payments.partition_point(|existing| existing.date <= date) - 1
    }

    pub fn remove_payment(&mut self, index: usize) -> Result<BillPayment, CoreError> {
        self.ensure_removable(
            RowKind::Payment,
            index,
            self.payments.len(),
            self.saved_payment_count,
        )?;
        let removed = self.payments.remove(index);
        self.modified = true;
        debug!(index, payment = %removed.display_label(), "payment removed");
        Ok(removed)
    }

    /// Swaps the row at `index` for `item` wholesale; rows are never edited field by field.
    pub(crate) fn replace_item(&mut self, index: usize, item: BillItem) -> Result<(), CoreError> {
        let slot = self.items.get_mut(index).ok_or(CoreError::RowNotFound {
            kind: RowKind::Item,
            index,
        })?;
        *slot = item;
        self.modified = true;
        Ok(())
    }

    /// Applies a header change and flags the session as modified.
    pub fn update_bill<F>(&mut self, mutator: F)
    where
        F: FnOnce(&mut Bill),
    {
        mutator(&mut self.bill);
        self.modified = true;
    }

    /// Header access for derived fields (totals) that do not count as an operator change.
    pub(crate) fn bill_mut(&mut self) -> &mut Bill {
        &mut self.bill
    }

    /// Adopts the rows confirmed by the persistence service and advances the saved boundary.
    pub fn mark_committed(&mut self, bill: Bill, items: Vec<BillItem>, payments: Vec<BillPayment>) {
        let unassigned = items.iter().filter(|item| !item.is_persisted()).count()
            + payments.iter().filter(|payment| !payment.is_persisted()).count();
        if unassigned > 0 {
            warn!(bill = bill.id(), unassigned, "committed rows came back without ids");
        }
        *self = Self::load(bill, items, payments);
    }

    fn ensure_removable(
        &self,
        kind: RowKind,
        index: usize,
        len: usize,
        saved: usize,
    ) -> Result<(), CoreError> {
        if index < saved {
            return Err(CoreError::ProtectedRow { kind, index });
        }
        if index >= len {
            return Err(CoreError::RowNotFound { kind, index });
        }
        Ok(())
    }
}
