//! Sampled rate history of one currency

use super::chain::RateSource;
use super::datum::RateDatum;
use super::store::RateDatumStore;
use crate::error::{LedgerError, Result};
use crate::series::VirtualInterpolator;
use crate::types::{key_to_timestamp, timestamp_key, CurrencyId, OwnerId, Timestamp};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateHistoryPoint {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: Timestamp,
    /// `None` when the datum's reference currency has no rate at that date
    pub rate_to_base: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateHistory {
    pub points: Vec<RateHistoryPoint>,
    pub earliest: Option<RateDatum>,
    pub latest: Option<RateDatum>,
}

impl RateHistory {
    fn empty() -> Self {
        Self {
            points: Vec::new(),
            earliest: None,
            latest: None,
        }
    }
}

/// Sample a currency's base rate `divisions` times between its earliest
/// and latest datum inside `[start, end]`.
///
/// Sample `i` sits at `earliest + i * (latest - earliest) / divisions`,
/// rounded to the millisecond, so the latest datum itself is not sampled.
/// Fewer than two datums in range yields an empty history.
pub async fn rate_history<S, R>(
    store: &S,
    rates: &R,
    owner: OwnerId,
    currency: CurrencyId,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    divisions: usize,
) -> Result<RateHistory>
where
    S: RateDatumStore,
    R: RateSource,
{
    if divisions == 0 {
        return Err(LedgerError::InvalidData(
            "rate history needs at least one division".to_string(),
        ));
    }

    let datums = store
        .query_rate_datums_between(owner, currency, start, end)
        .await?;
    if datums.len() < 2 {
        return Ok(RateHistory::empty());
    }

    let (earliest, latest) = match (
        datums.iter().min_by_key(|d| d.date),
        datums.iter().max_by_key(|d| d.date),
    ) {
        (Some(min), Some(max)) => (min.clone(), max.clone()),
        _ => return Ok(RateHistory::empty()),
    };

    let datums_ref = &datums;
    let interpolator = VirtualInterpolator::from_entries(
        datums.iter(),
        |d| d.key(),
        |key: Decimal| datum_base_value(rates, datums_ref, key),
    );

    let min_key = timestamp_key(&earliest.date);
    let step = (timestamp_key(&latest.date) - min_key) / Decimal::from(divisions);

    let mut points = Vec::with_capacity(divisions);
    for i in 0..divisions {
        let key = (min_key + step * Decimal::from(i))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let date = key_to_timestamp(key)
            .ok_or_else(|| LedgerError::InvalidData(format!("sample key {} is not a date", key)))?;
        let rate_to_base = match interpolator.get_value(key).await {
            Ok(rate) => rate,
            Err(LedgerError::RateUnavailable { .. }) => None,
            Err(e) => return Err(e),
        };
        points.push(RateHistoryPoint { date, rate_to_base });
    }

    log::debug!(
        "Sampled {} rate points for currency {} between {} and {}",
        points.len(),
        currency,
        earliest.date,
        latest.date
    );

    Ok(RateHistory {
        points,
        earliest: Some(earliest),
        latest: Some(latest),
    })
}

/// Base value of one unit of the currency quoted by the datum at `key`
async fn datum_base_value<R: RateSource>(
    rates: &R,
    datums: &[RateDatum],
    key: Decimal,
) -> Result<Decimal> {
    let datum = datums
        .iter()
        .find(|d| d.key() == key)
        .ok_or_else(|| LedgerError::InvalidData(format!("no rate datum at key {}", key)))?;
    let reference = rates
        .rate_to_base(datum.ref_amount_currency_id, datum.date)
        .await?
        .ok_or(LedgerError::RateUnavailable {
            currency: datum.ref_amount_currency_id,
            date: datum.date,
        })?;
    datum
        .amount
        .checked_mul(reference)
        .ok_or(LedgerError::Overflow("valuing a rate datum"))
}
