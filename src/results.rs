//! Across-year results module.
//!
//! A `ResultsStore` merges the yearly statistics of one entity under the
//! study's year weights. Hourly sums are fixed point and per-year scalars
//! are keyed by year, so merging years in any order or in any number of
//! batches leads to the same content.

use crate::calendar::HOURS_PER_YEAR;
use crate::category::ResultKind;
use crate::error::VariableError;
use crate::intermediate::IntermediateValues;
use crate::numeric::FixedPoint;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, TryReserveError};

/// Weighted merge of the years simulated for one entity.
///
/// # Examples
///
/// ```rust
/// use adqstat::{IntermediateValues, ResultsStore};
/// use adqstat::calendar::HOURS_PER_YEAR;
///
/// let mut low = IntermediateValues::new();
/// let mut high = IntermediateValues::new();
/// for hour in 0..HOURS_PER_YEAR {
///     low.accumulate(hour, 10.0);
///     high.accumulate(hour, 20.0);
/// }
/// low.compute_statistics_for_current_year();
/// high.compute_statistics_for_current_year();
///
/// let mut store = ResultsStore::new();
/// store.merge(0, 0.5, &low).unwrap();
/// store.merge(1, 1.5, &high).unwrap();
///
/// assert_eq!(store.annual_average(), 17.5);
/// assert_eq!(store.min(), Some((0, 10.0)));
/// assert_eq!(store.max(), Some((1, 20.0)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsStore {
    /// Sum over merged years of `weight * hourly sample`.
    weighted_hours: Vec<FixedPoint>,
    /// Weight and annual average of every merged year.
    ///
    /// Scalar statistics are reduced from here in year order.
    years: BTreeMap<u32, MergedYear>,
}

/// What a merged year contributes to the scalar statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct MergedYear {
    weight: f64,
    annual: f64,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self {
            weighted_hours: vec![FixedPoint::ZERO; HOURS_PER_YEAR],
            years: BTreeMap::new(),
        }
    }

    /// Create an empty store, reporting allocation failure instead of aborting.
    pub fn try_new() -> Result<Self, TryReserveError> {
        let mut weighted_hours = Vec::new();
        weighted_hours.try_reserve_exact(HOURS_PER_YEAR)?;
        weighted_hours.resize(HOURS_PER_YEAR, FixedPoint::ZERO);
        Ok(Self {
            weighted_hours,
            years: BTreeMap::new(),
        })
    }

    /// Approximate bytes held by one store, heap included.
    pub fn memory_usage(&self) -> u64 {
        (std::mem::size_of::<Self>()
            + std::mem::size_of::<FixedPoint>() * self.weighted_hours.len()
            + (std::mem::size_of::<u32>() + std::mem::size_of::<MergedYear>()) * self.years.len())
            as u64
    }

    /// Forget every merged year.
    pub fn reset(&mut self) {
        self.weighted_hours.fill(FixedPoint::ZERO);
        self.years.clear();
    }

    /// Merge the finalized statistics of `year` with weight `weight`.
    ///
    /// Hourly sums are kept in fixed point and the scalar statistics are
    /// reduced in year order, so the content does not depend on the merge
    /// order.
    pub fn merge(
        &mut self,
        year: u32,
        weight: f64,
        values: &IntermediateValues,
    ) -> Result<(), VariableError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(VariableError::InvalidWeight { year, weight });
        }
        let annual = values.annual_average();
        match self.years.entry(year) {
            Entry::Occupied(_) => return Err(VariableError::YearAlreadyMerged(year)),
            Entry::Vacant(slot) => {
                slot.insert(MergedYear { weight, annual });
            }
        }

        for (sum, &sample) in self.weighted_hours.iter_mut().zip(&values.hour) {
            *sum += FixedPoint::from_f64(weight * sample);
        }
        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.years.values().map(|y| y.weight).sum()
    }

    /// Merged years, ascending.
    pub fn years(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.years.keys().copied()
    }

    pub fn contains_year(&self, year: u32) -> bool {
        self.years.contains_key(&year)
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Weighted across-year average of every period.
    ///
    /// Returns zeros when nothing has been merged or the total weight is zero.
    pub fn average(&self) -> IntermediateValues {
        let mut average = IntermediateValues::new();
        let total_weight = self.total_weight();
        if total_weight > 0.0 {
            for (out, &sum) in average.hour.iter_mut().zip(&self.weighted_hours) {
                *out = sum.to_f64() / total_weight;
            }
        }
        average.compute_statistics_for_current_year();
        average
    }

    /// Weighted across-year mean of the annual averages.
    pub fn annual_average(&self) -> f64 {
        let total_weight = self.total_weight();
        if total_weight > 0.0 {
            self.years.values().map(|y| y.weight * y.annual).sum::<f64>() / total_weight
        } else {
            0.0
        }
    }

    /// Weighted standard deviation of the annual averages.
    pub fn std_deviation(&self) -> f64 {
        let total_weight = self.total_weight();
        if total_weight <= 0.0 {
            return 0.0;
        }
        let mean = self.annual_average();
        let variance = self
            .years
            .values()
            .map(|y| y.weight * (y.annual - mean).powi(2))
            .sum::<f64>()
            / total_weight;
        variance.max(0.0).sqrt()
    }

    /// Smallest annual average and the year it occurred in.
    ///
    /// Ties keep the smallest year.
    pub fn min(&self) -> Option<(u32, f64)> {
        self.extremum(|candidate, best| candidate < best)
    }

    /// Largest annual average and the year it occurred in.
    pub fn max(&self) -> Option<(u32, f64)> {
        self.extremum(|candidate, best| candidate > best)
    }

    fn extremum(&self, better: impl Fn(f64, f64) -> bool) -> Option<(u32, f64)> {
        self.years
            .iter()
            .fold(None, |best, (&year, merged)| match best {
                Some((_, value)) if !better(merged.annual, value) => best,
                _ => Some((year, merged.annual)),
            })
    }

    /// Annual statistic of the given kind; zero when nothing is merged.
    pub fn value(&self, kind: ResultKind) -> f64 {
        match kind {
            ResultKind::Average => self.annual_average(),
            ResultKind::StdDeviation => self.std_deviation(),
            ResultKind::Min => self.min().map_or(0.0, |(_, v)| v),
            ResultKind::Max => self.max().map_or(0.0, |(_, v)| v),
        }
    }
}

impl Default for ResultsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_year(value: f64) -> IntermediateValues {
        let mut values = IntermediateValues::new();
        for hour in 0..HOURS_PER_YEAR {
            values.accumulate(hour, value);
        }
        values.compute_statistics_for_current_year();
        values
    }

    #[test]
    fn test_weighted_average() {
        let mut store = ResultsStore::new();
        store.merge(0, 0.5, &constant_year(10.0)).unwrap();
        store.merge(1, 1.5, &constant_year(20.0)).unwrap();

        assert_eq!(store.total_weight(), 2.0);
        assert_eq!(store.annual_average(), 17.5);
        let average = store.average();
        assert_eq!(average.hour[0], 17.5);
        assert_eq!(average.day[0], 17.5 * 24.0);
    }

    #[test]
    fn test_merge_twice_is_rejected() {
        let mut store = ResultsStore::new();
        store.merge(3, 1.0, &constant_year(1.0)).unwrap();
        assert_eq!(
            store.merge(3, 1.0, &constant_year(1.0)),
            Err(VariableError::YearAlreadyMerged(3))
        );
        assert_eq!(store.total_weight(), 1.0);
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let mut store = ResultsStore::new();
        assert!(store.merge(0, -0.5, &constant_year(1.0)).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_order_does_not_change_content() {
        let years = [(0, 0.25, 4.0), (1, 2.0, 8.0), (2, 1.0, 8.0), (3, 0.5, 1.0)];

        let mut forward = ResultsStore::new();
        for &(year, weight, value) in &years {
            forward.merge(year, weight, &constant_year(value)).unwrap();
        }
        let mut backward = ResultsStore::new();
        for &(year, weight, value) in years.iter().rev() {
            backward.merge(year, weight, &constant_year(value)).unwrap();
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.max(), Some((1, 8.0)));
        assert_eq!(forward.min(), Some((3, 1.0)));
    }

    #[test]
    fn test_inexact_weights_merge_identically_in_any_order() {
        let years = [(0, 0.1, 1.3), (1, 0.7, 3.3), (2, 0.3, 7.1), (3, 0.2, 2.9)];

        let mut forward = ResultsStore::new();
        for &(year, weight, value) in &years {
            forward.merge(year, weight, &constant_year(value)).unwrap();
        }
        let mut backward = ResultsStore::new();
        for &(year, weight, value) in years.iter().rev() {
            backward.merge(year, weight, &constant_year(value)).unwrap();
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.average(), backward.average());
        assert_eq!(forward.std_deviation(), backward.std_deviation());
        assert!((forward.annual_average() - 5.15 / 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_std_deviation() {
        let mut store = ResultsStore::new();
        store.merge(0, 1.0, &constant_year(2.0)).unwrap();
        store.merge(1, 1.0, &constant_year(4.0)).unwrap();
        assert_eq!(store.std_deviation(), 1.0);
        assert_eq!(store.value(ResultKind::StdDeviation), 1.0);
    }

    #[test]
    fn test_empty_store_reports_zeros() {
        let store = ResultsStore::try_new().unwrap();
        assert_eq!(store.annual_average(), 0.0);
        assert_eq!(store.value(ResultKind::Min), 0.0);
        assert_eq!(store.average().year, 0.0);
    }

    #[test]
    fn test_reset_forgets_years() {
        let mut store = ResultsStore::new();
        store.merge(0, 1.0, &constant_year(5.0)).unwrap();
        store.reset();
        assert_eq!(store, ResultsStore::new());
        store.merge(0, 1.0, &constant_year(5.0)).unwrap();
    }
}
