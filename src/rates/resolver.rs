//! Nearest-two datum resolution

use super::cache::RateDatumCache;
use super::datum::RateDatum;
use super::store::RateDatumStore;
use crate::error::{LedgerError, Result};
use crate::types::{CurrencyId, OwnerId, Timestamp};

/// Finds the (up to) two datums closest in time to a target date.
///
/// Results pass through a [`RateDatumCache`] bound to one owner, so a
/// resolver must only be used for that owner's currencies.
#[derive(Debug)]
pub struct NearestDatumResolver<'s, S> {
    store: &'s S,
    cache: RateDatumCache,
}

impl<'s, S: RateDatumStore> NearestDatumResolver<'s, S> {
    pub fn new(store: &'s S, owner: OwnerId) -> Self {
        Self {
            store,
            cache: RateDatumCache::for_owner(owner),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.cache.owner()
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn cache(&self) -> &RateDatumCache {
        &self.cache
    }

    /// The datums of `currency` nearest to `target`, closest first.
    ///
    /// Returns zero, one or two datums. Ties on distance keep store order.
    /// The pair is not guaranteed to bracket `target`: both may lie on the
    /// same side of it.
    pub async fn find_nearest_two(
        &self,
        owner: OwnerId,
        currency: CurrencyId,
        target: Timestamp,
    ) -> Result<Vec<RateDatum>> {
        if let Some(cached) = self.cache.lookup(owner, currency, &target)? {
            return Ok(cached);
        }

        let mut datums = self.store.query_rate_datums(owner, currency).await?;
        for datum in &datums {
            check_datum(datum, owner, currency)?;
        }

        datums.sort_by_key(|d| d.distance_ms(&target));
        datums.truncate(2);

        if let [first, second] = datums.as_slice() {
            let brackets = (first.date <= target) != (second.date <= target)
                || first.date == target
                || second.date == target;
            if !brackets {
                log::debug!(
                    "Nearest datums of currency {} do not bracket {}",
                    currency,
                    target
                );
            }
        }

        self.cache.store(owner, currency, target, datums.clone())?;
        Ok(datums)
    }
}

fn check_datum(datum: &RateDatum, owner: OwnerId, currency: CurrencyId) -> Result<()> {
    if datum.owner_id != owner {
        return Err(LedgerError::DataIntegrity {
            context: "rate datum query",
            expected_owner: owner,
            found_owner: datum.owner_id,
        });
    }
    if datum.ref_currency_id != currency {
        return Err(LedgerError::Misconfiguration(format!(
            "store returned a datum of currency {} for currency {}",
            datum.ref_currency_id, currency
        )));
    }
    datum.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::store::InMemoryRateDatumStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::future::Future;

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    fn fixture() -> (InMemoryRateDatumStore, OwnerId, CurrencyId) {
        let store = InMemoryRateDatumStore::new();
        let owner = OwnerId::new_v4();
        let (eur, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4());
        for (d, amount) in [(1, dec!(1.00)), (10, dec!(1.10)), (20, dec!(1.20))] {
            store.add_datum(RateDatum::new(owner, eur, usd, day(d), amount).unwrap());
        }
        (store, owner, eur)
    }

    #[tokio::test]
    async fn test_nearest_two_closest_first() {
        let (store, owner, eur) = fixture();
        let resolver = NearestDatumResolver::new(&store, owner);

        let found = resolver.find_nearest_two(owner, eur, day(12)).await.unwrap();
        let amounts: Vec<Decimal> = found.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![dec!(1.10), dec!(1.20)]);
    }

    #[tokio::test]
    async fn test_non_bracketing_pair_is_returned() {
        let (store, owner, eur) = fixture();
        let resolver = NearestDatumResolver::new(&store, owner);

        let found = resolver.find_nearest_two(owner, eur, day(28)).await.unwrap();
        let amounts: Vec<Decimal> = found.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![dec!(1.20), dec!(1.10)]);
    }

    #[tokio::test]
    async fn test_cache_absorbs_repeat_queries() {
        let (store, owner, eur) = fixture();
        let resolver = NearestDatumResolver::new(&store, owner);

        resolver.find_nearest_two(owner, eur, day(5)).await.unwrap();
        resolver.find_nearest_two(owner, eur, day(5)).await.unwrap();
        assert_eq!(store.reads(), 1);
        assert_eq!(resolver.cache().hits(), 1);

        resolver.find_nearest_two(owner, eur, day(6)).await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_unknown_currency_is_empty() {
        let (store, owner, _) = fixture();
        let resolver = NearestDatumResolver::new(&store, owner);
        let found = resolver
            .find_nearest_two(owner, CurrencyId::new_v4(), day(5))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    /// Store that ignores the owner filter
    struct LeakyStore(Vec<RateDatum>);

    impl RateDatumStore for LeakyStore {
        fn query_rate_datums(
            &self,
            _owner: OwnerId,
            _currency: CurrencyId,
        ) -> impl Future<Output = Result<Vec<RateDatum>>> + Send {
            let datums = self.0.clone();
            async move { Ok(datums) }
        }
    }

    #[tokio::test]
    async fn test_foreign_datum_rejected() {
        let (owner, stranger) = (OwnerId::new_v4(), OwnerId::new_v4());
        let (eur, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4());
        let store = LeakyStore(vec![RateDatum::new(stranger, eur, usd, day(1), dec!(9)).unwrap()]);
        let resolver = NearestDatumResolver::new(&store, owner);

        let err = resolver.find_nearest_two(owner, eur, day(2)).await.unwrap_err();
        assert!(matches!(err, LedgerError::DataIntegrity { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_wrong_currency_rejected() {
        let owner = OwnerId::new_v4();
        let (eur, gbp, usd) = (CurrencyId::new_v4(), CurrencyId::new_v4(), CurrencyId::new_v4());
        let store = LeakyStore(vec![RateDatum::new(owner, gbp, usd, day(1), dec!(1.3)).unwrap()]);
        let resolver = NearestDatumResolver::new(&store, owner);

        let err = resolver.find_nearest_two(owner, eur, day(2)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Misconfiguration(_)));
    }
}
