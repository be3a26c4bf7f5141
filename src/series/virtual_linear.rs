//! Lazy linear interpolation
//!
//! Same bracketing and interpolation as [`LinearInterpolator`](super::LinearInterpolator),
//! but only keys are held eagerly. Values are produced on demand by an async
//! resolver, called for at most the two keys bracketing a query.

use super::keyed::{KeyedSeries, SearchWindow};
use super::linear::{apply_scale, interpolate_pair};
use rust_decimal::Decimal;
use std::future::Future;

/// Linear interpolator whose values are resolved asynchronously per key.
///
/// The resolver is not deduplicated: querying the same key twice resolves it
/// twice. Cache upstream if resolution is expensive.
///
/// # Example
/// ```
/// use rusty_ledger::series::VirtualInterpolator;
/// use rust_decimal::Decimal;
///
/// # tokio_test_block(async {
/// let keys = vec![Decimal::ZERO, Decimal::ONE];
/// let interp = VirtualInterpolator::from_entries(keys, |k| *k, |key: Decimal| async move {
///     Ok::<_, std::convert::Infallible>(key * Decimal::from(100))
/// });
///
/// let value = interp.get_value(Decimal::new(5, 1)).await.unwrap();
/// assert_eq!(value, Some(Decimal::from(50)));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub struct VirtualInterpolator<F> {
    keys: KeyedSeries<()>,
    value_fn: F,
    result_scale: Option<u32>,
}

impl<F> VirtualInterpolator<F> {
    /// Extract keys from `items` now; defer values to `value_fn`
    pub fn from_entries<T, K>(items: impl IntoIterator<Item = T>, key_fn: K, value_fn: F) -> Self
    where
        K: Fn(&T) -> Decimal,
    {
        Self {
            keys: KeyedSeries::from_entries(items, key_fn, |_| ()),
            value_fn,
            result_scale: None,
        }
    }

    /// Round every returned value to `scale` decimal places
    pub fn with_result_scale(mut self, scale: Option<u32>) -> Self {
        self.result_scale = scale;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in descending order
    pub fn keys(&self) -> impl Iterator<Item = &Decimal> + '_ {
        self.keys.keys()
    }
}

impl<F, Fut, E> VirtualInterpolator<F>
where
    F: Fn(Decimal) -> Fut,
    Fut: Future<Output = Result<Decimal, E>>,
{
    /// Value at `x`, resolving only the bracketing keys.
    ///
    /// Returns `Ok(None)` for an empty series or a query outside the keys.
    /// The two bracket lookups are driven concurrently and joined before
    /// interpolating; the first resolver error is returned as is.
    pub async fn get_value(&self, x: Decimal) -> Result<Option<Decimal>, E> {
        let window = match self.keys.search(&x) {
            Some(window) => window,
            None => return Ok(None),
        };

        let value = match window {
            SearchWindow::Exact(index) => {
                let key = self.keys.points()[index].key;
                (self.value_fn)(key).await?
            }
            SearchWindow::Adjacent { upper, lower } => {
                if !self.keys.covers(&x, upper, lower) {
                    return Ok(None);
                }
                let upper_key = self.keys.points()[upper].key;
                let lower_key = self.keys.points()[lower].key;

                let (upper_value, lower_value) =
                    tokio::try_join!((self.value_fn)(upper_key), (self.value_fn)(lower_key))?;

                interpolate_pair((upper_key, upper_value), (lower_key, lower_value), x)
            }
        };

        Ok(Some(apply_scale(value, self.result_scale)))
    }
}

impl<F> std::fmt::Debug for VirtualInterpolator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualInterpolator")
            .field("keys", &self.keys.len())
            .field("result_scale", &self.result_scale)
            .finish()
    }
}
