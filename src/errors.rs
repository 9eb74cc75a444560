use billing_config::ConfigError;
use billing_core::{CoreError, PriceNotFound, ValidationError};
use thiserror::Error;

/// Error type returned by every [`crate::BillEditor`] command.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("No bill is open")]
    NoBillOpen,
}

impl BillingError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            BillingError::Core(err) => err.reason_code(),
            BillingError::Config(_) => "config",
            BillingError::NoBillOpen => "no_bill_open",
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Core(err.into())
    }
}

impl From<PriceNotFound> for BillingError {
    fn from(err: PriceNotFound) -> Self {
        BillingError::Core(err.into())
    }
}
