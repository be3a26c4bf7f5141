//! Per-owner cache of nearest-two datum lookups

use super::datum::RateDatum;
use crate::error::{LedgerError, Result};
use crate::types::{CurrencyId, OwnerId, Timestamp};
use hashbrown::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct NearestEntry {
    target: Timestamp,
    datums: Vec<RateDatum>,
}

/// Remembers the most recent nearest-datum result per (owner, currency).
///
/// A cache belongs to exactly one owner. Lookups for another owner, or an
/// entry holding another owner's datums, are integrity faults rather than
/// misses: handing one user's rates to another must never happen silently.
///
/// Only one target date is kept per currency, so a lookup hits only when its
/// date equals the date last stored.
#[derive(Debug)]
pub struct RateDatumCache {
    owner: OwnerId,
    entries: Mutex<HashMap<(OwnerId, CurrencyId), NearestEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RateDatumCache {
    pub fn for_owner(owner: OwnerId) -> Self {
        Self {
            owner,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<(OwnerId, CurrencyId), NearestEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_owner(&self, owner: OwnerId, context: &'static str) -> Result<()> {
        if owner != self.owner {
            return Err(LedgerError::DataIntegrity {
                context,
                expected_owner: self.owner,
                found_owner: owner,
            });
        }
        Ok(())
    }

    /// Cached datums for `currency` at exactly `target`, if any
    pub fn lookup(
        &self,
        owner: OwnerId,
        currency: CurrencyId,
        target: &Timestamp,
    ) -> Result<Option<Vec<RateDatum>>> {
        self.check_owner(owner, "rate datum cache lookup")?;

        let entries = self.entries();
        let hit = match entries.get(&(owner, currency)) {
            Some(entry) if entry.target == *target => {
                if let Some(foreign) = entry.datums.iter().find(|d| d.owner_id != self.owner) {
                    return Err(LedgerError::DataIntegrity {
                        context: "cached rate datum",
                        expected_owner: self.owner,
                        found_owner: foreign.owner_id,
                    });
                }
                Some(entry.datums.clone())
            }
            _ => None,
        };

        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(hit)
    }

    /// Replace the entry for `currency` with a result for `target`
    pub fn store(
        &self,
        owner: OwnerId,
        currency: CurrencyId,
        target: Timestamp,
        datums: Vec<RateDatum>,
    ) -> Result<()> {
        self.check_owner(owner, "rate datum cache store")?;
        if let Some(foreign) = datums.iter().find(|d| d.owner_id != self.owner) {
            return Err(LedgerError::DataIntegrity {
                context: "rate datum cache store",
                expected_owner: self.owner,
                found_owner: foreign.owner_id,
            });
        }
        self.entries()
            .insert((owner, currency), NearestEntry { target, datums });
        Ok(())
    }

    /// Drop the entry for one currency, e.g. after its datums changed
    pub fn invalidate(&self, currency: CurrencyId) {
        self.entries().remove(&(self.owner, currency));
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
