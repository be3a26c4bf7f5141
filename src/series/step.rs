//! Step-hold lookup over a series of arbitrary payloads

use super::keyed::{KeyedPoint, KeyedSeries, SearchWindow};
use rust_decimal::Decimal;

/// Holds the most recent observation at or before a query key.
///
/// No interpolation happens and `V` need not be numeric. Queries below the
/// smallest key return a caller-supplied default.
///
/// When several points share a key, which of them a query at that key
/// returns depends on the search path and is unspecified.
#[derive(Debug, Clone)]
pub struct StepInterpolator<V> {
    series: KeyedSeries<V>,
}

impl<V> StepInterpolator<V> {
    pub fn new(series: KeyedSeries<V>) -> Self {
        Self { series }
    }

    pub fn from_points(points: Vec<KeyedPoint<V>>) -> Self {
        Self::new(KeyedSeries::from_points(points))
    }

    /// Build from arbitrary items mapped to `(key, value)`
    pub fn from_entries<T, M>(items: impl IntoIterator<Item = T>, mapper: M) -> Self
    where
        M: Fn(T) -> (Decimal, V),
    {
        items
            .into_iter()
            .map(|item| {
                let (key, value) = mapper(item);
                KeyedPoint::new(key, value)
            })
            .collect::<KeyedSeries<V>>()
            .into()
    }

    pub fn series(&self) -> &KeyedSeries<V> {
        &self.series
    }

    pub fn min_key(&self) -> Option<Decimal> {
        self.series.min_key()
    }

    pub fn max_key(&self) -> Option<Decimal> {
        self.series.max_key()
    }

    /// Value held at `x`.
    ///
    /// * empty series: `None`
    /// * one point: that value for any `x`
    /// * `x` below the smallest key: `default_before_first`
    /// * otherwise the value of the largest key `<= x`
    ///
    /// # Example
    /// ```
    /// use rusty_ledger::series::StepInterpolator;
    /// use rust_decimal::Decimal;
    ///
    /// let stepper = StepInterpolator::from_entries(
    ///     vec![(10i64, "opened"), (20, "topped up")],
    ///     |(k, v)| (Decimal::from(k), v),
    /// );
    ///
    /// assert_eq!(stepper.get_value(Decimal::from(5), &"none"), Some(&"none"));
    /// assert_eq!(stepper.get_value(Decimal::from(15), &"none"), Some(&"opened"));
    /// assert_eq!(stepper.get_value(Decimal::from(99), &"none"), Some(&"topped up"));
    /// ```
    pub fn get_value<'a>(&'a self, x: Decimal, default_before_first: &'a V) -> Option<&'a V> {
        let points = self.series.points();
        let held = match self.series.search(&x)? {
            SearchWindow::Exact(index) => &points[index].value,
            SearchWindow::Adjacent { upper, lower } => {
                if x >= points[upper].key {
                    &points[upper].value
                } else if x < points[lower].key {
                    default_before_first
                } else {
                    &points[lower].value
                }
            }
        };
        Some(held)
    }
}

impl<V> From<KeyedSeries<V>> for StepInterpolator<V> {
    fn from(series: KeyedSeries<V>) -> Self {
        Self::new(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty() {
        let s: StepInterpolator<i32> = StepInterpolator::from_points(vec![]);
        assert_eq!(s.get_value(dec!(1), &0), None);
    }

    #[test]
    fn test_single_point_ignores_default() {
        let s = StepInterpolator::from_points(vec![KeyedPoint::new(dec!(10), 'a')]);
        assert_eq!(s.get_value(dec!(-5), &'z'), Some(&'a'));
        assert_eq!(s.get_value(dec!(50), &'z'), Some(&'a'));
    }

    #[test]
    fn test_holds_between_samples() {
        let s = StepInterpolator::from_entries(
            vec![(dec!(0), 1), (dec!(10), 2), (dec!(20), 3)],
            |p| p,
        );
        assert_eq!(s.get_value(dec!(-1), &0), Some(&0));
        assert_eq!(s.get_value(dec!(0), &0), Some(&1));
        assert_eq!(s.get_value(dec!(9.999), &0), Some(&1));
        assert_eq!(s.get_value(dec!(10), &0), Some(&2));
        assert_eq!(s.get_value(dec!(19), &0), Some(&2));
        assert_eq!(s.get_value(dec!(20), &0), Some(&3));
        assert_eq!(s.get_value(dec!(1000000), &0), Some(&3));
    }

    #[test]
    fn test_repeated_queries_are_stable() {
        let s = StepInterpolator::from_entries(vec![(dec!(1), "x"), (dec!(2), "y")], |p| p);
        let first = s.get_value(dec!(1.5), &"-");
        let second = s.get_value(dec!(1.5), &"-");
        assert_eq!(first, second);
        assert_eq!(first, Some(&"x"));
    }
}
