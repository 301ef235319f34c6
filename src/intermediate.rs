//! Intermediate values module.
//!
//! `IntermediateValues` is the per-(slot, entity) accumulator of one
//! simulated year: a fixed array of hourly samples and the period
//! reductions derived from it at year end.

use crate::calendar::{
    day_of_hour, month_of_day_table, week_of_day, DAYS_PER_YEAR, HOURS_PER_YEAR,
    MONTHS_PER_YEAR, WEEKS_PER_YEAR,
};
use crate::category::Precision;
use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;

/// Hourly samples of one entity for one year, with derived statistics.
///
/// Daily, weekly, monthly and annual values are sums of the hourly
/// samples they cover. They are only meaningful after
/// [`compute_statistics_for_current_year`](Self::compute_statistics_for_current_year).
///
/// # Examples
///
/// ```rust
/// use adqstat::IntermediateValues;
/// use adqstat::calendar::HOURS_PER_YEAR;
///
/// let mut values = IntermediateValues::new();
/// for hour in 0..HOURS_PER_YEAR {
///     values.accumulate(hour, 2.0);
/// }
/// values.compute_statistics_for_current_year();
///
/// assert_eq!(values.day[0], 48.0);
/// assert_eq!(values.year, 2.0 * HOURS_PER_YEAR as f64);
/// assert_eq!(values.annual_average(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateValues {
    pub hour: Vec<f64>,
    pub day: Vec<f64>,
    pub week: Vec<f64>,
    pub month: Vec<f64>,
    /// Annual total.
    pub year: f64,
    /// Smallest hourly sample of the year.
    pub min: f64,
    /// Largest hourly sample of the year.
    pub max: f64,
}

impl IntermediateValues {
    /// Create a zeroed buffer.
    pub fn new() -> Self {
        Self {
            hour: vec![0.0; HOURS_PER_YEAR],
            day: vec![0.0; DAYS_PER_YEAR],
            week: vec![0.0; WEEKS_PER_YEAR],
            month: vec![0.0; MONTHS_PER_YEAR],
            year: 0.0,
            min: 0.0,
            max: 0.0,
        }
    }

    /// Create a zeroed buffer, reporting allocation failure instead of aborting.
    pub fn try_new() -> Result<Self, TryReserveError> {
        Ok(Self {
            hour: try_zeroed(HOURS_PER_YEAR)?,
            day: try_zeroed(DAYS_PER_YEAR)?,
            week: try_zeroed(WEEKS_PER_YEAR)?,
            month: try_zeroed(MONTHS_PER_YEAR)?,
            year: 0.0,
            min: 0.0,
            max: 0.0,
        })
    }

    /// Bytes held by one buffer, heap included.
    pub fn memory_usage() -> u64 {
        (std::mem::size_of::<Self>()
            + std::mem::size_of::<f64>()
                * (HOURS_PER_YEAR + DAYS_PER_YEAR + WEEKS_PER_YEAR + MONTHS_PER_YEAR)) as u64
    }

    /// Zero every sample and every derived statistic.
    pub fn reset(&mut self) {
        self.hour.fill(0.0);
        self.day.fill(0.0);
        self.week.fill(0.0);
        self.month.fill(0.0);
        self.year = 0.0;
        self.min = 0.0;
        self.max = 0.0;
    }

    /// Add `value` to the sample of `hour`.
    ///
    /// Panics if `hour` is outside the year.
    #[inline]
    pub fn accumulate(&mut self, hour: usize, value: f64) {
        self.hour[hour] += value;
    }

    /// Derive daily, weekly, monthly and annual sums and hourly extrema.
    pub fn compute_statistics_for_current_year(&mut self) {
        self.day.fill(0.0);
        self.week.fill(0.0);
        self.month.fill(0.0);

        for (hour, &value) in self.hour.iter().enumerate() {
            self.day[day_of_hour(hour)] += value;
        }

        let months = month_of_day_table();
        for (day, &value) in self.day.iter().enumerate() {
            self.week[week_of_day(day)] += value;
            self.month[months[day] as usize] += value;
        }

        self.year = self.month.iter().sum();
        self.min = self.hour.iter().copied().fold(f64::INFINITY, f64::min);
        self.max = self.hour.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }

    /// Mean of the hourly samples.
    pub fn annual_average(&self) -> f64 {
        self.year / HOURS_PER_YEAR as f64
    }

    /// Values of the requested time resolution.
    ///
    /// `precision` should name a single resolution; when several bits are
    /// set the finest one wins.
    pub fn period_values(&self, precision: Precision) -> &[f64] {
        if precision.intersects(Precision::HOURLY) {
            &self.hour
        } else if precision.intersects(Precision::DAILY) {
            &self.day
        } else if precision.intersects(Precision::WEEKLY) {
            &self.week
        } else if precision.intersects(Precision::MONTHLY) {
            &self.month
        } else {
            std::slice::from_ref(&self.year)
        }
    }
}

impl Default for IntermediateValues {
    fn default() -> Self {
        Self::new()
    }
}

fn try_zeroed(len: usize) -> Result<Vec<f64>, TryReserveError> {
    let mut values = Vec::new();
    values.try_reserve_exact(len)?;
    values.resize(len, 0.0);
    Ok(values)
}
