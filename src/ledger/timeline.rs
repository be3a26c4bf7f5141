//! Balance timeline of a single container

use super::fragment::TransactionFragment;
use super::valuation::{Balances, LedgerValuation};
use crate::error::{LedgerError, Result};
use crate::rates::RateSource;
use crate::series::StepInterpolator;
use crate::types::{key_to_timestamp, timestamp_key, ContainerId, Timestamp};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: Timestamp,
    pub balances: Balances,
    pub worth: Option<Decimal>,
}

/// Running balances of `container` after each fragment date, keyed by
/// epoch milliseconds. Fragments sharing a date collapse into one entry.
fn running_balances(
    fragments: &[TransactionFragment],
    container: ContainerId,
) -> Result<BTreeMap<i64, Balances>> {
    let mut touching: Vec<&TransactionFragment> =
        fragments.iter().filter(|f| f.involves(container)).collect();
    touching.sort_by_key(|f| f.date());

    let mut running = Balances::new();
    let mut by_date = BTreeMap::new();
    for fragment in touching {
        for (touched, currency, delta) in fragment.deltas() {
            if touched != container {
                continue;
            }
            let balance = running.entry(currency).or_insert(Decimal::ZERO);
            *balance = balance
                .checked_add(delta)
                .ok_or(LedgerError::Overflow("summing a balance timeline"))?;
        }
        by_date.insert(fragment.date().timestamp_millis(), running.clone());
    }
    Ok(by_date)
}

impl<'r, R: RateSource> LedgerValuation<'r, R> {
    /// Sample a container's balances `divisions` times over `[start, end]`.
    ///
    /// Balances are held from one fragment to the next and are empty before
    /// the container's first fragment. Without a `start`, sampling begins
    /// at that first fragment. Each sample is also valued at its own date.
    pub async fn balance_timeline(
        &self,
        fragments: &[TransactionFragment],
        container: ContainerId,
        start: Option<Timestamp>,
        end: Timestamp,
        divisions: usize,
    ) -> Result<Vec<TimelinePoint>> {
        if divisions == 0 {
            return Err(LedgerError::InvalidData(
                "balance timeline needs at least one division".to_string(),
            ));
        }

        let stepper = StepInterpolator::from_entries(
            running_balances(fragments, container)?,
            |(millis, balances)| (Decimal::from(millis), balances),
        );

        let range_start = match start {
            Some(start) => timestamp_key(&start),
            None => stepper.min_key().ok_or_else(|| {
                LedgerError::InvalidData(format!(
                    "container {} has no fragments to start a timeline from",
                    container
                ))
            })?,
        };
        let range_end = timestamp_key(&end);
        if range_end < range_start {
            return Err(LedgerError::InvalidData(format!(
                "timeline end {} precedes its start",
                end
            )));
        }

        let step = (range_end - range_start) / Decimal::from(divisions);
        let empty = Balances::new();
        let mut points = Vec::with_capacity(divisions);

        for i in 0..divisions {
            let key = (range_start + step * Decimal::from(i))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .clamp(range_start, range_end);
            let date = key_to_timestamp(key).ok_or_else(|| {
                LedgerError::InvalidData(format!("sample key {} is not a date", key))
            })?;
            // a lone fragment date is held in both directions by the stepper
            let balances = match stepper.min_key() {
                Some(first) if key >= first => {
                    stepper.get_value(key, &empty).cloned().unwrap_or_default()
                }
                _ => empty.clone(),
            };
            let worth = self.worth_of_balances(&balances, date).await?;
            points.push(TimelinePoint {
                date,
                balances,
                worth,
            });
        }

        log::debug!(
            "Built {} point timeline for container {}",
            points.len(),
            container
        );
        Ok(points)
    }
}
