use std::fmt;

use billing_domain::{PriceKey, RecordId};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger row families guarded by the saved/unsaved boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Item,
    Payment,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKind::Item => f.write_str("item"),
            RowKind::Payment => f.write_str("payment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} #{index} is already saved and cannot be removed")]
    ProtectedRow { kind: RowKind, index: usize },
    #[error("{kind} #{index} does not exist")]
    RowNotFound { kind: RowKind, index: usize },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    PriceNotFound(#[from] PriceNotFound),
    #[error("Price list not found: {0}")]
    PriceListNotFound(RecordId),
    #[error("Price catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("Bill not found: {0}")]
    BillNotFound(RecordId),
    #[error("Patient not found: {0}")]
    PatientNotFound(RecordId),
    #[error("Patient {patient_id} already has pending bill(s): {bills:?}")]
    PendingBillExists {
        patient_id: RecordId,
        bills: Vec<RecordId>,
    },
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl CoreError {
    /// Stable machine-readable reason so callers never need to match on messages.
    pub fn reason_code(&self) -> &'static str {
        match self {
            CoreError::ProtectedRow { .. } => "protected_row",
            CoreError::RowNotFound { .. } => "row_not_found",
            CoreError::Validation(err) => err.reason_code(),
            CoreError::PriceNotFound(_) => "price_not_found",
            CoreError::PriceListNotFound(_) => "price_list_not_found",
            CoreError::CatalogUnavailable(_) => "catalog_unavailable",
            CoreError::BillNotFound(_) => "bill_not_found",
            CoreError::PatientNotFound(_) => "patient_not_found",
            CoreError::PendingBillExists { .. } => "pending_bill_exists",
            CoreError::Persistence(_) | CoreError::Io(_) | CoreError::Serde(_) => "persistence",
            CoreError::InvalidOperation(_) => "invalid_operation",
        }
    }

    /// `true` for failures reported by the persistence collaborator.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            CoreError::Persistence(_) | CoreError::Io(_) | CoreError::Serde(_)
        )
    }
}

/// Refusals of operator input. The ledger is left untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payment dated {date} precedes bill date {bill_date}")]
    PaymentBeforeBillDate {
        date: NaiveDateTime,
        bill_date: NaiveDateTime,
    },
    #[error("payment dated {date} precedes last recorded payment {last}")]
    PaymentBeforeLastPayment {
        date: NaiveDateTime,
        last: NaiveDateTime,
    },
    #[error("future-dated payment not allowed ({date} is after {now})")]
    FuturePayment {
        date: NaiveDateTime,
        now: NaiveDateTime,
    },
    #[error("bill is dated in a past day; a payment date must be supplied")]
    PaymentDateRequired,
    #[error("invalid amount `{0}`")]
    InvalidAmount(String),
    #[error("amount `{value}` has more than {scale} decimal places")]
    AmountScale { value: String, scale: u32 },
    #[error("amount `{value}` cannot be held at {scale} decimal places")]
    AmountOutOfRange { value: String, scale: u32 },
    #[error("bill totals would exceed the representable range")]
    TotalsOutOfRange,
    #[error("invalid quantity `{0}`")]
    InvalidQuantity(String),
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("cash {cash} does not cover balance {balance}")]
    InsufficientCash { cash: Decimal, balance: Decimal },
    #[error("balance {balance} is negative; action unavailable")]
    NegativeBalance { balance: Decimal },
    #[error("bill is already closed")]
    BillClosed,
    #[error("bill of {bill_month} belongs to a closed period; items can no longer change")]
    ItemsLocked { bill_month: String },
    #[error("bill date {date} falls after the first payment {first_payment}")]
    BillDateAfterPayments {
        date: NaiveDateTime,
        first_payment: NaiveDateTime,
    },
}

impl ValidationError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            ValidationError::PaymentBeforeBillDate { .. } => "payment_precedes_bill_date",
            ValidationError::PaymentBeforeLastPayment { .. } => "payment_precedes_last_payment",
            ValidationError::FuturePayment { .. } => "future_payment",
            ValidationError::PaymentDateRequired => "payment_date_required",
            ValidationError::InvalidAmount(_) => "invalid_amount",
            ValidationError::AmountScale { .. } => "amount_scale",
            ValidationError::AmountOutOfRange { .. } => "amount_out_of_range",
            ValidationError::TotalsOutOfRange => "totals_out_of_range",
            ValidationError::InvalidQuantity(_) => "invalid_quantity",
            ValidationError::EmptyDescription => "empty_description",
            ValidationError::InsufficientCash { .. } => "insufficient_cash",
            ValidationError::NegativeBalance { .. } => "negative_balance",
            ValidationError::BillClosed => "bill_closed",
            ValidationError::ItemsLocked { .. } => "items_locked",
            ValidationError::BillDateAfterPayments { .. } => "bill_date_after_payments",
        }
    }
}

/// A catalog-bound line whose key is missing from the selected price list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("price {key} not found in list {list_id}{}", line_suffix(.line))]
pub struct PriceNotFound {
    pub list_id: RecordId,
    pub key: PriceKey,
    pub line: Option<usize>,
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|index| format!(" (line #{index})"))
        .unwrap_or_default()
}
