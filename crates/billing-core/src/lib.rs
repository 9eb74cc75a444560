//! billing-core
//!
//! Bill editing rules and services: ledger, totals, mutation guard, lifecycle.
//! Depends on billing-domain. No terminal I/O; collaborators are reached through traits.

pub mod catalog;
pub mod computation;
pub mod error;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod lifecycle;
pub mod patient;
pub mod printer;
pub mod storage;
pub mod time;

pub use catalog::*;
pub use computation::*;
pub use error::{CoreError, PriceNotFound, RowKind, ValidationError};
pub use events::*;
pub use guard::*;
pub use ledger::*;
pub use lifecycle::*;
pub use patient::*;
pub use printer::*;
pub use storage::*;
pub use time::*;

#[cfg(test)]
mod tests;
