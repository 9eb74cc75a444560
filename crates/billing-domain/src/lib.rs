//! billing-domain
//!
//! Pure domain models (Bill, BillItem, BillPayment, PriceList, Price, PricesOthers, Patient).
//! No I/O, no persistence, no editor state. Only data types and core enums.

pub mod bill;
pub mod common;
pub mod item;
pub mod patient;
pub mod payment;
pub mod price;

pub use bill::*;
pub use common::*;
pub use item::*;
pub use patient::*;
pub use payment::*;
pub use price::*;
