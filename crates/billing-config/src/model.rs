use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Largest number of fractional digits an exact decimal amount can carry.
pub const MAX_CURRENCY_SCALE: u32 = 28;

/// Settings consulted by a bill editing session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Display-only currency code.
    pub currency: String,
    #[serde(default = "Config::default_currency_scale")]
    pub currency_scale: u32,
    /// Operator recorded on new bills and payments.
    #[serde(default = "Config::default_user")]
    pub user: String,
    #[serde(default = "Config::default_single_user")]
    pub single_user: bool,
    /// When off, a patient with another OPEN bill cannot be put on a new one.
    #[serde(default)]
    pub allow_multiple_open_bills: bool,
    #[serde(default)]
    pub receipt_printer: bool,
    #[serde(default)]
    pub print_as_paid: bool,
    /// Invoice date of the last saved bill, offered as the next bill's date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_bill_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root for bills, catalog and patients. Defaults to the user data dir.
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            currency_scale: Self::default_currency_scale(),
            user: Self::default_user(),
            single_user: Self::default_single_user(),
            allow_multiple_open_bills: false,
            receipt_printer: false,
            print_as_paid: false,
            last_bill_date: None,
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_currency_scale() -> u32 {
        2
    }

    pub fn default_user() -> String {
        "admin".into()
    }

    pub fn default_single_user() -> bool {
        true
    }

    /// Name written on bills: the configured user, or `admin` in single-user mode.
    pub fn operator(&self) -> String {
        if self.single_user || self.user.trim().is_empty() {
            Self::default_user()
        } else {
            self.user.trim().to_string()
        }
    }

    pub fn remember_bill_date(&mut self, date: NaiveDateTime) {
        self.last_bill_date = Some(date);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency_scale > MAX_CURRENCY_SCALE {
            return Err(ConfigError::Invalid {
                field: "currency_scale",
                reason: format!("must be at most {MAX_CURRENCY_SCALE}"),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "currency",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("PatientBilling")
    }
}
