//! Fixed-point accumulation.
//!
//! Floating-point addition is not associative, so a running `f64` sum of
//! weighted samples depends on the order the years are merged in.
//! `FixedPoint` rounds each addend once onto a binary grid and adds the
//! grid values as integers, which makes the sum independent of order.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// An `i128` scaled by `2^FRACTION_BITS`.
///
/// Addition wraps, so it stays associative and commutative even if an
/// intermediate sum leaves the range; the final sum is correct whenever it
/// fits.
///
/// # Examples
///
/// ```rust
/// use adqstat::numeric::FixedPoint;
///
/// let terms = [0.1 * 1.1, 0.2 * 2.3, 0.7 * 3.7, 0.3 * 5.9];
/// let sum = |acc: FixedPoint, &t: &f64| acc + FixedPoint::from_f64(t);
/// let forward = terms.iter().fold(FixedPoint::ZERO, sum);
/// let backward = terms.iter().rev().fold(FixedPoint::ZERO, sum);
///
/// assert_eq!(forward, backward);
/// assert!((forward.to_f64() - 4.93).abs() < 1e-9);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FixedPoint(i128);

impl FixedPoint {
    /// Bits after the binary point; the grid step is about `2.3e-10`.
    pub const FRACTION_BITS: i32 = 32;

    pub const ZERO: FixedPoint = FixedPoint(0);

    /// Round `value` to the nearest grid point.
    ///
    /// Out-of-range values saturate and NaN maps to zero.
    pub fn from_f64(value: f64) -> Self {
        Self((value * 2f64.powi(Self::FRACTION_BITS)).round() as i128)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 2f64.powi(Self::FRACTION_BITS)
    }

    /// Raw scaled value.
    pub fn raw(self) -> i128 {
        self.0
    }
}

impl Add for FixedPoint {
    type Output = FixedPoint;

    fn add(self, rhs: FixedPoint) -> FixedPoint {
        FixedPoint(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for FixedPoint {
    fn add_assign(&mut self, rhs: FixedPoint) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_on_grid() {
        assert_eq!(FixedPoint::from_f64(17.5).to_f64(), 17.5);
        assert_eq!(FixedPoint::from_f64(-3.25).to_f64(), -3.25);
        assert_eq!(FixedPoint::from_f64(0.0), FixedPoint::ZERO);
    }

    #[test]
    fn test_nan_is_zero() {
        assert_eq!(FixedPoint::from_f64(f64::NAN), FixedPoint::ZERO);
    }

    #[test]
    fn test_wrapping_sum_recovers() {
        let big = FixedPoint(i128::MAX);
        let one = FixedPoint::from_f64(1.0);
        // Overflow then come back: the final sum is still exact
        let sum = big + one + FixedPoint(-i128::MAX);
        assert_eq!(sum, one);
    }
}
