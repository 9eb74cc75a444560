#![doc(test(attr(deny(warnings))))]

//! Patient Billing edits a single patient invoice: billable lines, payments and
//! refunds, with totals and balance recomputed after every change.

pub mod editor;
pub mod errors;
pub mod listeners;
pub mod session;
pub mod utils;

pub use editor::{BillEditor, CatalogState, OpenReport, SaveOutcome};
pub use errors::BillingError;
pub use listeners::CommitListeners;
pub use session::{EditorServices, SessionSettings};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Patient billing tracing initialized.");
    });
}
