//! Error types for rusty_ledger
//!
//! Numeric "no answer" conditions (empty series, out-of-range query) are
//! `Option::None` results, not errors. This enum covers faults that must
//! abort the enclosing valuation.

use crate::types::{CurrencyId, OwnerId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for rusty_ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    #[error(
        "Data integrity violation in {context}: expected owner {expected_owner}, found {found_owner}"
    )]
    DataIntegrity {
        context: &'static str,
        expected_owner: OwnerId,
        found_owner: OwnerId,
    },

    #[error("Invalid transaction fragment: {0}")]
    InvalidFragment(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No rate available for currency {currency} at {date}")]
    RateUnavailable {
        currency: CurrencyId,
        date: DateTime<Utc>,
    },

    #[error("Decimal overflow while {0}")]
    Overflow(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LedgerError {
    /// True for faults that indicate corrupted or misconfigured data rather
    /// than a recoverable lookup failure. These must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Misconfiguration(_)
                | LedgerError::DataIntegrity { .. }
                | LedgerError::Overflow(_)
        )
    }
}

/// Result type alias for rusty_ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
