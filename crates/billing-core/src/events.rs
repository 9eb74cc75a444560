use billing_domain::Bill;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Inserted,
    Updated,
}

/// Published once the persistence service confirmed a save.
#[derive(Debug, Clone, PartialEq)]
pub struct BillCommitted {
    pub bill: Bill,
    pub mode: CommitMode,
    pub new_payments: usize,
    /// Invoice date to remember as the next bill's default.
    pub last_bill_date: NaiveDateTime,
}

/// Receives commit notifications. Listeners cannot veto a commit.
pub trait CommitListener: Send + Sync {
    fn bill_committed(&self, event: &BillCommitted);
}

impl<F> CommitListener for F
where
    F: Fn(&BillCommitted) + Send + Sync,
{
    fn bill_committed(&self, event: &BillCommitted) {
        self(event)
    }
}
