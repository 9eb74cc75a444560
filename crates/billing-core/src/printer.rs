use billing_domain::{Bill, BillPayment};

use crate::CoreError;

/// Receipt output device or report service.
pub trait ReceiptPrinter: Send + Sync {
    fn print_payments(&self, bill: &Bill, payments: &[BillPayment]) -> Result<(), CoreError>;
    fn print_bill(&self, bill: &Bill) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    Payments,
    PaidBill,
}

/// Printing switches taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiptPolicy {
    pub receipt_printer: bool,
    pub print_as_paid: bool,
}

impl ReceiptPolicy {
    /// Receipts due after a successful save.
    pub fn receipts_after_save(&self, had_new_payments: bool, closed: bool) -> Vec<ReceiptKind> {
        let mut receipts = Vec::new();
        if had_new_payments {
            receipts.push(ReceiptKind::Payments);
        }
        if closed && self.receipt_printer && self.print_as_paid {
            receipts.push(ReceiptKind::PaidBill);
        }
        receipts
    }
}
