//! Eager linear interpolation over a decimal series

use super::keyed::{KeyedPoint, KeyedSeries, SearchWindow};
use rust_decimal::{Decimal, RoundingStrategy};

/// Interpolate between two observations.
///
/// `left` and `right` are `(key, value)` pairs in either order. Equal values
/// short-circuit without division. Equal keys cannot be divided by, so the
/// two values are averaged and a warning is logged: it means the input held
/// two observations for the same key.
pub(crate) fn interpolate_pair(
    (key_left, value_left): (Decimal, Decimal),
    (key_right, value_right): (Decimal, Decimal),
    x: Decimal,
) -> Decimal {
    if value_left == value_right {
        return value_left;
    }
    if key_left == key_right {
        log::warn!(
            "Repeated key {} in series, averaging {} and {}",
            key_left,
            value_left,
            value_right
        );
        return (value_left + value_right) / Decimal::TWO;
    }

    let key_range = key_right - key_left;
    let value_range = value_right - value_left;
    value_left + ((x - key_left) / key_range) * value_range
}

/// Apply the caller's result scale, if any
pub(crate) fn apply_scale(value: Decimal, result_scale: Option<u32>) -> Decimal {
    match result_scale {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    }
}

/// Piecewise linear interpolator over (key, value) decimals.
///
/// Never extrapolates: a query outside `[min key, max key]` yields `None`.
///
/// # Example
/// ```
/// use rusty_ledger::series::LinearInterpolator;
/// use rust_decimal::Decimal;
///
/// let points = vec![(Decimal::ZERO, Decimal::ZERO), (Decimal::ONE, Decimal::from(100))];
/// let interp = LinearInterpolator::from_entries(points, |p| p.0, |p| p.1);
///
/// assert_eq!(interp.get_value("0.4111".parse().unwrap()), Some("41.11".parse().unwrap()));
/// assert_eq!(interp.get_value(Decimal::from(2)), None);
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    series: KeyedSeries<Decimal>,
    result_scale: Option<u32>,
}

impl LinearInterpolator {
    pub fn new(series: KeyedSeries<Decimal>) -> Self {
        Self {
            series,
            result_scale: None,
        }
    }

    pub fn from_points(points: Vec<KeyedPoint<Decimal>>) -> Self {
        Self::new(KeyedSeries::from_points(points))
    }

    /// Build from arbitrary items using key and value accessors
    pub fn from_entries<T, K, F>(items: impl IntoIterator<Item = T>, key_fn: K, value_fn: F) -> Self
    where
        K: Fn(&T) -> Decimal,
        F: Fn(&T) -> Decimal,
    {
        Self::new(KeyedSeries::from_entries(items, key_fn, value_fn))
    }

    /// Round every returned value to `scale` decimal places
    pub fn with_result_scale(mut self, scale: Option<u32>) -> Self {
        self.result_scale = scale;
        self
    }

    pub fn series(&self) -> &KeyedSeries<Decimal> {
        &self.series
    }

    /// `(min key, max key)`, or `None` when empty
    pub fn domain(&self) -> Option<(Decimal, Decimal)> {
        Some((self.series.min_key()?, self.series.max_key()?))
    }

    /// Value at `x`.
    ///
    /// * empty series: `None`
    /// * one point: that point's value for any `x`
    /// * otherwise the linear interpolation between the bracketing points,
    ///   or `None` if `x` lies outside the observed keys
    pub fn get_value(&self, x: Decimal) -> Option<Decimal> {
        let value = match self.series.search(&x)? {
            SearchWindow::Exact(index) => self.series.points()[index].value,
            SearchWindow::Adjacent { upper, lower } => {
                if !self.series.covers(&x, upper, lower) {
                    return None;
                }
                let points = self.series.points();
                interpolate_pair(
                    (points[upper].key, points[upper].value),
                    (points[lower].key, points[lower].value),
                    x,
                )
            }
        };
        Some(apply_scale(value, self.result_scale))
    }
}
