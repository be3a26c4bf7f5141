//! Keyed series - immutable points ordered by descending key
//!
//! Every interpolator in this module is built on a [`KeyedSeries`]. The
//! series owns its points, sorts them once at construction (largest key
//! first) and never reorders them afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single observation in a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedPoint<V> {
    pub key: Decimal,
    pub value: V,
}

impl<V> KeyedPoint<V> {
    pub fn new(key: Decimal, value: V) -> Self {
        Self { key, value }
    }
}

/// Where a query key landed after binary search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchWindow {
    /// The search hit a point whose key equals the query.
    Exact(usize),
    /// Two adjacent indices. `upper` holds the larger key.
    ///
    /// The query is not guaranteed to lie between them: it can be above the
    /// largest key or below the smallest one, see [`KeyedSeries::covers`].
    Adjacent { upper: usize, lower: usize },
}

/// Points sorted by descending key
///
/// Duplicate keys are kept. The sort is stable, so duplicates keep their
/// input order relative to each other.
#[derive(Debug, Clone)]
pub struct KeyedSeries<V> {
    points: Vec<KeyedPoint<V>>,
}

impl<V> KeyedSeries<V> {
    /// Build a series from points in any order
    pub fn from_points(mut points: Vec<KeyedPoint<V>>) -> Self {
        points.sort_by(|a, b| b.key.cmp(&a.key));
        Self { points }
    }

    /// Build a series from arbitrary items using key and value accessors
    ///
    /// # Example
    /// ```
    /// use rusty_ledger::series::KeyedSeries;
    /// use rust_decimal::Decimal;
    ///
    /// let raw = vec![(1i64, "a"), (3, "c"), (2, "b")];
    /// let series = KeyedSeries::from_entries(raw, |r| Decimal::from(r.0), |r| r.1);
    ///
    /// assert_eq!(series.max_key(), Some(Decimal::from(3)));
    /// assert_eq!(series.get(0).unwrap().value, "c");
    /// ```
    pub fn from_entries<T, K, F>(items: impl IntoIterator<Item = T>, key_fn: K, value_fn: F) -> Self
    where
        K: Fn(&T) -> Decimal,
        F: Fn(&T) -> V,
    {
        let points = items
            .into_iter()
            .map(|item| KeyedPoint::new(key_fn(&item), value_fn(&item)))
            .collect();
        Self::from_points(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in storage order (descending key)
    pub fn points(&self) -> &[KeyedPoint<V>] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&KeyedPoint<V>> {
        self.points.get(index)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Decimal> + '_ {
        self.points.iter().map(|p| &p.key)
    }

    pub fn max_key(&self) -> Option<Decimal> {
        self.points.first().map(|p| p.key)
    }

    pub fn min_key(&self) -> Option<Decimal> {
        self.points.last().map(|p| p.key)
    }

    /// Narrow `x` onto the series by binary search.
    ///
    /// Returns `None` for an empty series and `Exact(0)` for a single point,
    /// whatever `x` is. Otherwise the `[upper, lower]` window is halved until
    /// it is one step wide, stopping early if the midpoint key equals `x`.
    pub fn search(&self, x: &Decimal) -> Option<SearchWindow> {
        match self.points.len() {
            0 => None,
            1 => Some(SearchWindow::Exact(0)),
            len => {
                let mut upper = 0;
                let mut lower = len - 1;

                while lower - upper > 1 {
                    let mid = (upper + lower) / 2;
                    match self.points[mid].key.cmp(x) {
                        Ordering::Equal => return Some(SearchWindow::Exact(mid)),
                        Ordering::Greater => upper = mid,
                        Ordering::Less => lower = mid,
                    }
                }

                Some(SearchWindow::Adjacent { upper, lower })
            }
        }
    }

    /// Whether `x` lies within the keys of an adjacent window (inclusive)
    pub fn covers(&self, x: &Decimal, upper: usize, lower: usize) -> bool {
        *x <= self.points[upper].key && *x >= self.points[lower].key
    }
}

impl<V> FromIterator<KeyedPoint<V>> for KeyedSeries<V> {
    fn from_iter<I: IntoIterator<Item = KeyedPoint<V>>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}
