//! Rate datum - one historical observation of a currency's value

use crate::error::{LedgerError, Result};
use crate::types::{timestamp_key, CurrencyId, OwnerId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// "1 unit of `ref_currency_id` is worth `amount` of `ref_amount_currency_id`,
/// observed at `date`."
///
/// At most one datum exists per (owner, ref currency, date); the store
/// enforces that, not this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDatum {
    pub owner_id: OwnerId,
    pub ref_currency_id: CurrencyId,
    pub ref_amount_currency_id: CurrencyId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: Timestamp,
    pub amount: Decimal,
}

impl RateDatum {
    pub fn new(
        owner_id: OwnerId,
        ref_currency_id: CurrencyId,
        ref_amount_currency_id: CurrencyId,
        date: Timestamp,
        amount: Decimal,
    ) -> Result<Self> {
        let datum = Self {
            owner_id,
            ref_currency_id,
            ref_amount_currency_id,
            date,
            amount,
        };
        datum.validate()?;
        Ok(datum)
    }

    /// Reject datums that reference themselves or predate the epoch
    pub fn validate(&self) -> Result<()> {
        if self.ref_currency_id == self.ref_amount_currency_id {
            return Err(LedgerError::Misconfiguration(format!(
                "rate datum for currency {} is quoted in itself",
                self.ref_currency_id
            )));
        }
        if self.date.timestamp_millis() <= 0 {
            return Err(LedgerError::InvalidData(format!(
                "rate datum date must be after the epoch, got {}",
                self.date
            )));
        }
        Ok(())
    }

    /// Series key for this datum (epoch milliseconds)
    pub fn key(&self) -> Decimal {
        timestamp_key(&self.date)
    }

    /// Absolute distance to `target` in milliseconds
    pub fn distance_ms(&self, target: &Timestamp) -> u64 {
        self.date
            .timestamp_millis()
            .abs_diff(target.timestamp_millis())
    }
}
