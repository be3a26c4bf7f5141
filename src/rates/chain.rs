//! Currency to base currency rates
//!
//! A currency's rate is never stored against the base currency directly.
//! Each datum quotes it in some reference currency, whose own rate at that
//! datum's date is resolved recursively until the base currency is reached.
//! Datums at two dates around the target are combined with a
//! [`VirtualInterpolator`], so only the reference rates actually needed are
//! ever resolved.

use super::datum::RateDatum;
use super::resolver::NearestDatumResolver;
use super::store::RateDatumStore;
use crate::config::ValuationConfig;
use crate::error::{LedgerError, Result};
use crate::series::linear::apply_scale;
use crate::series::VirtualInterpolator;
use crate::types::{timestamp_key, CurrencyId, OwnerId, Timestamp};
use hashbrown::HashMap;
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Anything that can price a currency in the base currency at a date
pub trait RateSource: Send + Sync {
    /// Value of one unit of `currency` in the base currency at `date`.
    ///
    /// `Ok(None)` means no rate data covers the currency.
    fn rate_to_base(
        &self,
        currency: CurrencyId,
        date: Timestamp,
    ) -> impl Future<Output = Result<Option<Decimal>>> + Send;
}

/// Resolves rates for one owner against one base currency.
///
/// Resolved rates are memoized per (currency, date) for the lifetime of the
/// chain. Build a fresh chain after the underlying datums change.
///
/// Between two datums the rate is interpolated. Outside the datums' range,
/// or when both nearest datums fall on the same side of the date, the
/// nearest datum's rate is held.
pub struct RateChain<'s, S> {
    owner: OwnerId,
    base_currency: CurrencyId,
    resolver: NearestDatumResolver<'s, S>,
    memo: Mutex<HashMap<(CurrencyId, i64), Decimal>>,
    result_scale: Option<u32>,
    max_chain_depth: usize,
}

impl<'s, S: RateDatumStore> RateChain<'s, S> {
    pub fn new(store: &'s S, owner: OwnerId, config: &ValuationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            owner,
            base_currency: config.require_base_currency()?,
            resolver: NearestDatumResolver::new(store, owner),
            memo: Mutex::new(HashMap::new()),
            result_scale: config.result_scale,
            max_chain_depth: config.max_chain_depth,
        })
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn base_currency(&self) -> CurrencyId {
        self.base_currency
    }

    pub fn resolver(&self) -> &NearestDatumResolver<'s, S> {
        &self.resolver
    }

    pub fn clear_memo(&self) {
        self.memo().clear();
    }

    fn memo(&self) -> MutexGuard<'_, HashMap<(CurrencyId, i64), Decimal>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rate of `currency` at `date`, or `RateUnavailable` if some currency
    /// along the chain has no datums at all.
    pub async fn resolve_rate(&self, currency: CurrencyId, date: Timestamp) -> Result<Decimal> {
        self.resolve(currency, date, Vec::new()).await
    }

    /// How many units of `to` one unit of `from` buys at `date`
    pub async fn currency_to_currency_rate(
        &self,
        from: CurrencyId,
        to: CurrencyId,
        date: Timestamp,
    ) -> Result<Option<Decimal>> {
        let (from_rate, to_rate) =
            tokio::try_join!(self.rate_to_base(from, date), self.rate_to_base(to, date))?;
        let (from_rate, to_rate) = match (from_rate, to_rate) {
            (Some(f), Some(t)) => (f, t),
            _ => return Ok(None),
        };
        if to_rate.is_zero() {
            return Err(LedgerError::InvalidData(format!(
                "currency {} has a zero rate at {}",
                to, date
            )));
        }
        from_rate
            .checked_div(to_rate)
            .map(|rate| Some(apply_scale(rate, self.result_scale)))
            .ok_or(LedgerError::Overflow("dividing currency rates"))
    }

    fn resolve<'a>(
        &'a self,
        currency: CurrencyId,
        date: Timestamp,
        path: Vec<CurrencyId>,
    ) -> BoxFuture<'a, Result<Decimal>> {
        Box::pin(async move {
            if currency == self.base_currency {
                return Ok(Decimal::ONE);
            }
            if path.contains(&currency) {
                return Err(LedgerError::Misconfiguration(format!(
                    "currency {} references itself through its rate chain",
                    currency
                )));
            }
            if path.len() >= self.max_chain_depth {
                return Err(LedgerError::Misconfiguration(format!(
                    "rate chain of currency {} exceeds {} steps",
                    currency, self.max_chain_depth
                )));
            }

            let memo_key = (currency, date.timestamp_millis());
            let memoized = self.memo().get(&memo_key).copied();
            if let Some(rate) = memoized {
                return Ok(rate);
            }

            let datums = self
                .resolver
                .find_nearest_two(self.owner, currency, date)
                .await?;
            let nearest = match datums.first() {
                Some(datum) => datum.clone(),
                None => return Err(LedgerError::RateUnavailable { currency, date }),
            };

            let mut next_path = path;
            next_path.push(currency);
            let next_path = &next_path;
            let datums = &datums;

            let interpolator = VirtualInterpolator::from_entries(
                datums.iter(),
                |d| d.key(),
                |key: Decimal| -> BoxFuture<'a, Result<Decimal>> {
                    match datums.iter().find(|d| d.key() == key) {
                        Some(datum) => self.datum_value(datum.clone(), next_path.clone()),
                        None => Box::pin(async move {
                            Err(LedgerError::InvalidData(format!(
                                "no rate datum at key {}",
                                key
                            )))
                        }),
                    }
                },
            )
            .with_result_scale(self.result_scale);

            let rate = match interpolator.get_value(timestamp_key(&date)).await? {
                Some(rate) => rate,
                None => {
                    log::debug!(
                        "Holding nearest rate of currency {} from {} for {}",
                        currency,
                        nearest.date,
                        date
                    );
                    let held = self.datum_value(nearest, next_path.clone()).await?;
                    apply_scale(held, self.result_scale)
                }
            };

            self.memo().insert(memo_key, rate);
            Ok(rate)
        })
    }

    /// Base value of one unit of the datum's currency at the datum's date
    fn datum_value<'a>(
        &'a self,
        datum: RateDatum,
        path: Vec<CurrencyId>,
    ) -> BoxFuture<'a, Result<Decimal>> {
        Box::pin(async move {
            let reference = self
                .resolve(datum.ref_amount_currency_id, datum.date, path)
                .await?;
            datum
                .amount
                .checked_mul(reference)
                .ok_or(LedgerError::Overflow("chaining currency rates"))
        })
    }
}

impl<'s, S: RateDatumStore> RateSource for RateChain<'s, S> {
    fn rate_to_base(
        &self,
        currency: CurrencyId,
        date: Timestamp,
    ) -> impl Future<Output = Result<Option<Decimal>>> + Send {
        async move {
            match self.resolve_rate(currency, date).await {
                Ok(rate) => Ok(Some(rate)),
                Err(LedgerError::RateUnavailable { currency: missing, date }) => {
                    log::debug!("No rate for currency {} at {}", missing, date);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
    }
}

impl<'s, S> std::fmt::Debug for RateChain<'s, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateChain")
            .field("owner", &self.owner)
            .field("base_currency", &self.base_currency)
            .field("result_scale", &self.result_scale)
            .field("max_chain_depth", &self.max_chain_depth)
            .finish()
    }
}
