//! Rate datum persistence contract and an in-memory implementation

use super::datum::RateDatum;
use crate::error::Result;
use crate::types::{CurrencyId, OwnerId, Timestamp};
use hashbrown::HashMap;
use std::future::Future;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Source of stored rate observations
///
/// Results are unordered; callers do their own sorting.
pub trait RateDatumStore: Send + Sync {
    /// All datums of `owner` whose ref currency is `currency`
    fn query_rate_datums(
        &self,
        owner: OwnerId,
        currency: CurrencyId,
    ) -> impl Future<Output = Result<Vec<RateDatum>>> + Send;

    /// Datums dated within `[start, end]`; an open bound is unbounded
    fn query_rate_datums_between(
        &self,
        owner: OwnerId,
        currency: CurrencyId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> impl Future<Output = Result<Vec<RateDatum>>> + Send {
        let all = self.query_rate_datums(owner, currency);
        async move {
            Ok(all
                .await?
                .into_iter()
                .filter(|d| start.map_or(true, |s| d.date >= s))
                .filter(|d| end.map_or(true, |e| d.date <= e))
                .collect())
        }
    }
}

/// In-memory datum storage
///
/// Stores datums as `(owner, ref currency) -> Vec<RateDatum>`. Adding a
/// datum for an existing (owner, ref currency, date) replaces it. Every
/// query is counted so tests can tell whether a cache absorbed it.
///
/// # Example
/// ```
/// use rusty_ledger::rates::{InMemoryRateDatumStore, RateDatum, RateDatumStore};
/// use rusty_ledger::types::{CurrencyId, OwnerId};
/// use chrono::{TimeZone, Utc};
/// use rust_decimal::Decimal;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryRateDatumStore::new();
/// let (owner, eur, usd) = (OwnerId::new_v4(), CurrencyId::new_v4(), CurrencyId::new_v4());
/// let dt = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
///
/// // 1 EUR = 1.20 USD
/// store.add_datum(RateDatum::new(owner, eur, usd, dt, Decimal::new(120, 2)).unwrap());
///
/// let datums = store.query_rate_datums(owner, eur).await.unwrap();
/// assert_eq!(datums.len(), 1);
/// assert_eq!(store.reads(), 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRateDatumStore {
    datums: RwLock<HashMap<(OwnerId, CurrencyId), Vec<RateDatum>>>,
    reads: AtomicUsize,
}

impl InMemoryRateDatumStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<(OwnerId, CurrencyId), Vec<RateDatum>>> {
        self.datums.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<(OwnerId, CurrencyId), Vec<RateDatum>>> {
        self.datums.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(map: &mut HashMap<(OwnerId, CurrencyId), Vec<RateDatum>>, datum: RateDatum) {
        let bucket = map
            .entry((datum.owner_id, datum.ref_currency_id))
            .or_default();
        match bucket.iter_mut().find(|d| d.date == datum.date) {
            Some(existing) => *existing = datum,
            None => bucket.push(datum),
        }
    }

    /// Add a single datum
    pub fn add_datum(&self, datum: RateDatum) {
        let mut map = self.write_map();
        Self::insert(&mut map, datum);
    }

    /// Add multiple datums, validating all of them before inserting any
    pub fn add_datums(&self, datums: Vec<RateDatum>) -> Result<()> {
        for datum in &datums {
            datum.validate()?;
        }
        let mut map = self.write_map();
        for datum in datums {
            Self::insert(&mut map, datum);
        }
        Ok(())
    }

    /// Load datums from CSV
    ///
    /// Expected header: `owner_id,ref_currency_id,ref_amount_currency_id,date,amount`
    /// with `date` in epoch milliseconds and `amount` as a decimal string.
    pub fn load_from_csv<R: Read>(&self, reader: R) -> Result<usize> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut entries = Vec::new();
        for record in csv_reader.deserialize::<RateDatum>() {
            entries.push(record?);
        }

        let count = entries.len();
        self.add_datums(entries)?;
        log::debug!("Loaded {} rate datums from CSV", count);
        Ok(count)
    }

    /// Remove every datum
    pub fn clear(&self) {
        self.write_map().clear();
    }

    /// Total number of stored datums
    pub fn num_entries(&self) -> usize {
        self.read_map().values().map(Vec::len).sum()
    }

    /// Number of queries served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl RateDatumStore for InMemoryRateDatumStore {
    fn query_rate_datums(
        &self,
        owner: OwnerId,
        currency: CurrencyId,
    ) -> impl Future<Output = Result<Vec<RateDatum>>> + Send {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let datums = self
            .read_map()
            .get(&(owner, currency))
            .cloned()
            .unwrap_or_default();
        async move { Ok(datums) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn datum(owner: OwnerId, from: CurrencyId, to: CurrencyId, day: u32, amount: rust_decimal::Decimal) -> RateDatum {
        let dt = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        RateDatum::new(owner, from, to, dt, amount).unwrap()
    }

    #[tokio::test]
    async fn test_query_scoped_by_owner_and_currency() {
        let store = InMemoryRateDatumStore::new();
        let (alice, bob) = (OwnerId::new_v4(), OwnerId::new_v4());
        let (eur, gbp, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4(), CurrencyId::new_v4());

        store.add_datum(datum(alice, eur, usd, 1, dec!(1.1)));
        store.add_datum(datum(alice, gbp, usd, 1, dec!(1.3)));
        store.add_datum(datum(bob, eur, usd, 1, dec!(1.2)));

        let found = store.query_rate_datums(alice, eur).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, dec!(1.1));
        assert!(store.query_rate_datums(bob, gbp).await.unwrap().is_empty());
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_same_date_replaces() {
        let store = InMemoryRateDatumStore::new();
        let owner = OwnerId::new_v4();
        let (eur, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4());

        store.add_datum(datum(owner, eur, usd, 5, dec!(1.1)));
        store.add_datum(datum(owner, eur, usd, 5, dec!(1.15)));

        assert_eq!(store.num_entries(), 1);
        let found = store.query_rate_datums(owner, eur).await.unwrap();
        assert_eq!(found[0].amount, dec!(1.15));
    }

    #[tokio::test]
    async fn test_query_between_bounds_inclusive() {
        let store = InMemoryRateDatumStore::new();
        let owner = OwnerId::new_v4();
        let (eur, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4());
        for day in 1..=5 {
            store.add_datum(datum(owner, eur, usd, day, dec!(1)));
        }

        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap();
        let found = store
            .query_rate_datums_between(owner, eur, Some(start), Some(end))
            .await
            .unwrap();
        assert_eq!(found.len(), 3);

        let open = store
            .query_rate_datums_between(owner, eur, None, Some(start))
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn test_load_from_csv() {
        let owner = OwnerId::new_v4();
        let (eur, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4());
        let csv_data = format!(
            "owner_id,ref_currency_id,ref_amount_currency_id,date,amount\n\
             # comment lines are skipped\n\
             {o},{e},{u},1704067200000,1.0950\n\
             {o},{e},{u},1704153600000,1.1012\n",
            o = owner,
            e = eur,
            u = usd
        );

        let store = InMemoryRateDatumStore::new();
        let count = store.load_from_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.num_entries(), 2);
    }

    #[tokio::test]
    async fn test_load_from_csv_keeps_every_digit() {
        let owner = OwnerId::new_v4();
        let (eur, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4());
        let csv_data = format!(
            "owner_id,ref_currency_id,ref_amount_currency_id,date,amount\n\
             {owner},{eur},{usd},1704067200000,0.12345678901234567891\n"
        );

        let store = InMemoryRateDatumStore::new();
        store.load_from_csv(csv_data.as_bytes()).unwrap();

        let found = store.query_rate_datums(owner, eur).await.unwrap();
        assert_eq!(found[0].amount, dec!(0.12345678901234567891));
        assert_eq!(found[0].amount.to_string(), "0.12345678901234567891");
    }

    #[test]
    fn test_load_from_csv_rejects_self_reference() {
        let owner = OwnerId::new_v4();
        let eur = CurrencyId::new_v4();
        let csv_data = format!(
            "owner_id,ref_currency_id,ref_amount_currency_id,date,amount\n{},{},{},1704067200000,1\n",
            owner, eur, eur
        );

        let store = InMemoryRateDatumStore::new();
        let err = store.load_from_csv(csv_data.as_bytes()).unwrap_err();
        assert!(matches!(err, LedgerError::Misconfiguration(_)));
        assert_eq!(store.num_entries(), 0);
    }

    #[test]
    fn test_load_from_csv_bad_amount() {
        let csv_data = format!(
            "owner_id,ref_currency_id,ref_amount_currency_id,date,amount\n{},{},{},1704067200000,abc\n",
            OwnerId::new_v4(),
            CurrencyId::new_v4(),
            CurrencyId::new_v4()
        );

        let store = InMemoryRateDatumStore::new();
        assert!(matches!(
            store.load_from_csv(csv_data.as_bytes()),
            Err(LedgerError::Csv(_))
        ));
    }
}
