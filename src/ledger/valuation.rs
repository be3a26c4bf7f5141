//! Ledger valuation
//!
//! Replays transaction fragments into per-container balances and values
//! them in the base currency. Two valuations are reported per container:
//!
//! - **base value**: every fragment side valued at the rate of its own date
//!   and summed, i.e. what the movements were worth when they happened
//! - **worth**: the balances at the cutoff, marked at the cutoff's rates
//!
//! An unavailable rate is never treated as zero: it turns the affected
//! total into `None`.

use super::fragment::TransactionFragment;
use crate::error::{LedgerError, Result};
use crate::rates::RateSource;
use crate::types::{ContainerId, CurrencyId, Timestamp};
use hashbrown::HashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Amount held per currency
pub type Balances = BTreeMap<CurrencyId, Decimal>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerValuation {
    pub balances: Balances,
    /// Sum of the container's signed deltas, each at its fragment date's rate
    pub base_value: Option<Decimal>,
    /// Balances marked at the snapshot cutoff
    pub worth: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub cutoff: Timestamp,
    pub containers: BTreeMap<ContainerId, ContainerValuation>,
    pub net_worth: Option<Decimal>,
    pub total_base_value: Option<Decimal>,
}

impl LedgerSnapshot {
    pub fn container(&self, id: ContainerId) -> Option<&ContainerValuation> {
        self.containers.get(&id)
    }

    /// Base value of a container. A container no fragment touched is worth
    /// exactly zero, not unknown.
    pub fn base_value_of(&self, id: ContainerId) -> Option<Decimal> {
        match self.containers.get(&id) {
            Some(valuation) => valuation.base_value,
            None => Some(Decimal::ZERO),
        }
    }

    /// Balance of one currency in one container
    pub fn balance_of(&self, id: ContainerId, currency: CurrencyId) -> Decimal {
        self.containers
            .get(&id)
            .and_then(|v| v.balances.get(&currency).copied())
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncomeExpenseSummary {
    pub incomes: Decimal,
    /// Positive magnitude of value lost
    pub expenses: Decimal,
    /// Fragments skipped because a rate was unavailable
    pub unvalued_fragments: usize,
}

fn checked_add(total: Decimal, delta: Decimal) -> Result<Decimal> {
    total
        .checked_add(delta)
        .ok_or(LedgerError::Overflow("summing ledger balances"))
}

fn checked_mul(amount: Decimal, rate: Decimal) -> Result<Decimal> {
    amount
        .checked_mul(rate)
        .ok_or(LedgerError::Overflow("converting to base currency"))
}

/// Adds an optional term to an optional total; `None` is absorbing
fn add_known(total: Option<Decimal>, term: Option<Decimal>) -> Result<Option<Decimal>> {
    match (total, term) {
        (Some(total), Some(term)) => checked_add(total, term).map(Some),
        _ => Ok(None),
    }
}

/// Values fragments through a [`RateSource`]
#[derive(Debug)]
pub struct LedgerValuation<'r, R> {
    rates: &'r R,
}

impl<'r, R: RateSource> LedgerValuation<'r, R> {
    pub fn new(rates: &'r R) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &'r R {
        self.rates
    }

    /// Rate lookup memoized for the duration of one call
    async fn rate(
        &self,
        memo: &mut HashMap<(CurrencyId, i64), Option<Decimal>>,
        currency: CurrencyId,
        date: Timestamp,
    ) -> Result<Option<Decimal>> {
        let key = (currency, date.timestamp_millis());
        if let Some(rate) = memo.get(&key) {
            return Ok(*rate);
        }
        let rate = self.rates.rate_to_base(currency, date).await?;
        memo.insert(key, rate);
        Ok(rate)
    }

    /// Snapshot of every container touched by fragments dated at or
    /// before `cutoff`. Later fragments are ignored.
    pub async fn value_at(
        &self,
        fragments: &[TransactionFragment],
        cutoff: Timestamp,
    ) -> Result<LedgerSnapshot> {
        let mut memo = HashMap::new();
        let mut containers: BTreeMap<ContainerId, ContainerValuation> = BTreeMap::new();

        for fragment in fragments.iter().filter(|f| f.date() <= cutoff) {
            for (container, currency, delta) in fragment.deltas() {
                let rate = self.rate(&mut memo, currency, fragment.date()).await?;
                let entry = containers.entry(container).or_insert_with(|| ContainerValuation {
                    base_value: Some(Decimal::ZERO),
                    ..ContainerValuation::default()
                });

                let balance = entry.balances.entry(currency).or_insert(Decimal::ZERO);
                *balance = checked_add(*balance, delta)?;

                let term = rate.map(|r| checked_mul(delta, r)).transpose()?;
                entry.base_value = add_known(entry.base_value, term)?;
            }
        }

        let mut net_worth = Some(Decimal::ZERO);
        let mut total_base_value = Some(Decimal::ZERO);
        for valuation in containers.values_mut() {
            valuation.worth = self
                .worth_with_memo(&mut memo, &valuation.balances, cutoff)
                .await?;
            net_worth = add_known(net_worth, valuation.worth)?;
            total_base_value = add_known(total_base_value, valuation.base_value)?;
        }

        log::info!(
            "Valued {} containers at {}: net worth {}",
            containers.len(),
            cutoff,
            net_worth.map_or_else(|| "unavailable".to_string(), |w| w.to_string())
        );

        Ok(LedgerSnapshot {
            cutoff,
            containers,
            net_worth,
            total_base_value,
        })
    }

    /// Base-currency worth of `balances` at `date`
    pub async fn worth_of_balances(
        &self,
        balances: &Balances,
        date: Timestamp,
    ) -> Result<Option<Decimal>> {
        let mut memo = HashMap::new();
        self.worth_with_memo(&mut memo, balances, date).await
    }

    async fn worth_with_memo(
        &self,
        memo: &mut HashMap<(CurrencyId, i64), Option<Decimal>>,
        balances: &Balances,
        date: Timestamp,
    ) -> Result<Option<Decimal>> {
        let mut worth = Some(Decimal::ZERO);
        for (currency, amount) in balances {
            if amount.is_zero() {
                continue;
            }
            let rate = self.rate(memo, *currency, date).await?;
            let term = rate.map(|r| checked_mul(*amount, r)).transpose()?;
            worth = add_known(worth, term)?;
        }
        Ok(worth)
    }

    /// Value gained or lost by each fragment in `[start, cutoff]`.
    ///
    /// A fragment's change is its to-side value minus its from-side value,
    /// both at the fragment's date. Changes at or below zero count as
    /// expenses.
    pub async fn income_and_expense(
        &self,
        fragments: &[TransactionFragment],
        start: Option<Timestamp>,
        cutoff: Timestamp,
    ) -> Result<IncomeExpenseSummary> {
        let mut memo = HashMap::new();
        let mut summary = IncomeExpenseSummary::default();

        let in_range = fragments
            .iter()
            .filter(|f| f.date() <= cutoff && start.map_or(true, |s| f.date() >= s));

        for fragment in in_range {
            let mut change = Some(Decimal::ZERO);
            for (_, currency, delta) in fragment.deltas() {
                let rate = self.rate(&mut memo, currency, fragment.date()).await?;
                let term = rate.map(|r| checked_mul(delta, r)).transpose()?;
                change = add_known(change, term)?;
            }

            match change {
                Some(change) if change <= Decimal::ZERO => {
                    summary.expenses = checked_add(summary.expenses, -change)?;
                }
                Some(change) => {
                    summary.incomes = checked_add(summary.incomes, change)?;
                }
                None => summary.unvalued_fragments += 1,
            }
        }

        if summary.unvalued_fragments > 0 {
            log::warn!(
                "{} fragments left out of income and expense totals for lack of rates",
                summary.unvalued_fragments
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ledger::fragment::FragmentSide;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::future::Future;

    /// Rates that switch from `before` to `after` at `switch`
    pub(crate) struct SwitchingRates {
        pub rates: std::collections::HashMap<CurrencyId, (Decimal, Decimal)>,
        pub switch: Timestamp,
    }

    impl RateSource for SwitchingRates {
        fn rate_to_base(
            &self,
            currency: CurrencyId,
            date: Timestamp,
        ) -> impl Future<Output = Result<Option<Decimal>>> + Send {
            let rate = self
                .rates
                .get(&currency)
                .map(|(before, after)| if date < self.switch { *before } else { *after });
            async move { Ok(rate) }
        }
    }

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 4, d, 0, 0, 0).unwrap()
    }

    struct Setup {
        rates: SwitchingRates,
        usd: CurrencyId,
        eur: CurrencyId,
        bank: ContainerId,
        wallet: ContainerId,
    }

    fn setup() -> Setup {
        let (usd, eur) = (CurrencyId::new_v4(), CurrencyId::new_v4());
        let rates = SwitchingRates {
            rates: [(usd, (dec!(1), dec!(1))), (eur, (dec!(1.1), dec!(1.2)))]
                .into_iter()
                .collect(),
            switch: day(10),
        };
        Setup {
            rates,
            usd,
            eur,
            bank: ContainerId::new_v4(),
            wallet: ContainerId::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_rates_resolved_per_fragment_date() {
        let s = setup();
        let valuation = LedgerValuation::new(&s.rates);
        let fragments = vec![
            TransactionFragment::inflow(day(1), FragmentSide::new(s.bank, s.eur, dec!(100))),
            TransactionFragment::inflow(day(15), FragmentSide::new(s.bank, s.eur, dec!(100))),
        ];

        let snapshot = valuation.value_at(&fragments, day(20)).await.unwrap();
        assert_eq!(snapshot.base_value_of(s.bank), Some(dec!(230)));
        assert_eq!(snapshot.container(s.bank).unwrap().worth, Some(dec!(240)));
        assert_eq!(snapshot.balance_of(s.bank, s.eur), dec!(200));
    }

    #[tokio::test]
    async fn test_cutoff_excludes_later_fragments() {
        let s = setup();
        let valuation = LedgerValuation::new(&s.rates);
        let fragments = vec![
            TransactionFragment::inflow(day(1), FragmentSide::new(s.bank, s.usd, dec!(50))),
            TransactionFragment::outflow(day(12), FragmentSide::new(s.bank, s.usd, dec!(20))),
        ];

        let snapshot = valuation.value_at(&fragments, day(5)).await.unwrap();
        assert_eq!(snapshot.balance_of(s.bank, s.usd), dec!(50));
        assert_eq!(snapshot.net_worth, Some(dec!(50)));
    }

    #[tokio::test]
    async fn test_exchange_moves_value_between_containers() {
        let s = setup();
        let valuation = LedgerValuation::new(&s.rates);
        let fragments = vec![TransactionFragment::exchange(
            day(2),
            FragmentSide::new(s.bank, s.usd, dec!(110)),
            FragmentSide::new(s.wallet, s.eur, dec!(100)),
        )];

        let snapshot = valuation.value_at(&fragments, day(3)).await.unwrap();
        assert_eq!(snapshot.base_value_of(s.bank), Some(dec!(-110)));
        assert_eq!(snapshot.base_value_of(s.wallet), Some(dec!(110.0)));
        assert_eq!(snapshot.total_base_value, Some(dec!(0)));
    }

    #[tokio::test]
    async fn test_snapshot_json_is_stable() {
        let s = setup();
        let valuation = LedgerValuation::new(&s.rates);
        let mut fragments: Vec<TransactionFragment> = (0..8)
            .map(|_| {
                TransactionFragment::inflow(
                    day(1),
                    FragmentSide::new(ContainerId::new_v4(), s.usd, dec!(1)),
                )
            })
            .collect();

        let first = serde_json::to_string(&valuation.value_at(&fragments, day(2)).await.unwrap())
            .unwrap();
        fragments.reverse();
        let second = serde_json::to_string(&valuation.value_at(&fragments, day(2)).await.unwrap())
            .unwrap();
        assert_eq!(first, second);

        let snapshot = valuation.value_at(&fragments, day(2)).await.unwrap();
        let ids: Vec<ContainerId> = snapshot.containers.keys().copied().collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_missing_rate_is_none_not_zero() {
        let s = setup();
        let valuation = LedgerValuation::new(&s.rates);
        let unknown = CurrencyId::new_v4();
        let fragments = vec![
            TransactionFragment::inflow(day(1), FragmentSide::new(s.bank, unknown, dec!(5))),
            TransactionFragment::inflow(day(1), FragmentSide::new(s.wallet, s.usd, dec!(5))),
        ];

        let snapshot = valuation.value_at(&fragments, day(2)).await.unwrap();
        assert_eq!(snapshot.base_value_of(s.bank), None);
        assert_eq!(snapshot.container(s.bank).unwrap().worth, None);
        assert_eq!(snapshot.base_value_of(s.wallet), Some(dec!(5)));
        assert_eq!(snapshot.net_worth, None);
    }

    #[tokio::test]
    async fn test_income_and_expense() {
        let s = setup();
        let valuation = LedgerValuation::new(&s.rates);
        let fragments = vec![
            TransactionFragment::inflow(day(1), FragmentSide::new(s.bank, s.usd, dec!(1000))),
            TransactionFragment::outflow(day(2), FragmentSide::new(s.bank, s.usd, dec!(30))),
            // 100 USD buys 90 EUR worth 99 USD: 1 USD lost to fees
            TransactionFragment::exchange(
                day(3),
                FragmentSide::new(s.bank, s.usd, dec!(100)),
                FragmentSide::new(s.wallet, s.eur, dec!(90)),
            ),
            TransactionFragment::inflow(day(3), FragmentSide::new(s.wallet, CurrencyId::new_v4(), dec!(1))),
        ];

        let summary = valuation
            .income_and_expense(&fragments, Some(day(1)), day(5))
            .await
            .unwrap();
        assert_eq!(summary.incomes, dec!(1000));
        assert_eq!(summary.expenses, dec!(31.0));
        assert_eq!(summary.unvalued_fragments, 1);
    }
}
