//! Categories used to classify stages.
//!
//! Data levels, file levels and precisions are bitmasks so that a single
//! query ("area-level detail files") can be matched against every
//! registered stage at runtime.

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

macro_rules! bitmask {
    ($(#[$meta:meta])* $name:ident { $($(#[$cmeta:meta])* $flag:ident = $value:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            $($(#[$cmeta])* pub const $flag: $name = $name($value);)+

            /// `true` if at least one bit is shared with `other`.
            #[inline]
            pub fn intersects(self, other: $name) -> bool {
                self.0 & other.0 != 0
            }

            /// `true` if every bit of `other` is set in `self`.
            #[inline]
            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitmask! {
    /// Spatial level a stage reports on.
    DataLevel {
        AREA = 1,
        LINK = 2,
        SET_OF_AREAS = 4,
        SET_OF_LINKS = 8,
        ALL = 15,
    }
}

bitmask! {
    /// Report files a stage contributes to.
    FileLevel {
        /// Synthesis values per area or link.
        VALUES = 1,
        /// Per-entity details (one column per cluster).
        DETAILS = 2,
        /// Identifiers such as the year of the min/max.
        IDENTIFIERS = 4,
        ALL = 7,
    }
}

bitmask! {
    /// Time resolutions a stage can be reported at.
    Precision {
        HOURLY = 1,
        DAILY = 2,
        WEEKLY = 4,
        MONTHLY = 8,
        ANNUAL = 16,
        ALL = 31,
    }
}

/// Number of report columns a stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnCount {
    /// A fixed number of columns.
    Fixed(usize),
    /// One column per enabled entity, fixed at the last area initialisation.
    Dynamic,
}

impl ColumnCount {
    /// Resolve the column count for a given number of enabled entities.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use adqstat::category::ColumnCount;
    ///
    /// assert_eq!(ColumnCount::Dynamic.resolve(3), 3);
    /// assert_eq!(ColumnCount::Fixed(1).resolve(3), 1);
    /// ```
    pub fn resolve(self, enabled_entities: usize) -> usize {
        match self {
            ColumnCount::Fixed(n) => n,
            ColumnCount::Dynamic => enabled_entities,
        }
    }
}

/// How per-entity values are combined over a set of areas or links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialAggregate {
    Sum,
    Average,
}

impl SpatialAggregate {
    /// Combine `values`; an empty set aggregates to zero.
    pub fn apply(self, values: &[f64]) -> f64 {
        self.finish(values.iter().sum(), values.len())
    }

    /// Turn the `sum` of `count` values into the aggregate.
    pub fn finish(self, sum: f64, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        match self {
            SpatialAggregate::Sum => sum,
            SpatialAggregate::Average => sum / count as f64,
        }
    }
}

/// When the spatial aggregate is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialAggregateMode {
    /// On every year, before the years are merged.
    EachYear,
    /// Once, on the merged across-year results.
    PostProcessing,
}

/// Across-year statistics a stage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Average,
    StdDeviation,
    Min,
    Max,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmask_queries() {
        let levels = DataLevel::AREA | DataLevel::SET_OF_AREAS;
        assert!(levels.intersects(DataLevel::AREA));
        assert!(!levels.intersects(DataLevel::LINK));
        assert!(DataLevel::ALL.contains(levels));
        assert!(!levels.contains(DataLevel::ALL));
    }

    #[test]
    fn test_spatial_aggregate() {
        assert_eq!(SpatialAggregate::Sum.apply(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(SpatialAggregate::Average.apply(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(SpatialAggregate::Average.apply(&[]), 0.0);
    }

    #[test]
    fn test_precision_serializes_as_integer() {
        let json = serde_json::to_string(&(Precision::DAILY | Precision::ANNUAL)).unwrap();
        assert_eq!(json, "18");
    }
}
