//! Stage descriptors.
//!
//! A `StageDescriptor` is the static metadata of one statistic type:
//! how it is labelled, which reports it belongs to and how its columns
//! are laid out. Descriptors carry no runtime state.

use crate::category::{
    ColumnCount, DataLevel, FileLevel, Precision, ResultKind, SpatialAggregate,
    SpatialAggregateMode,
};
use crate::stage_id::StageId;
use serde::{Deserialize, Serialize};

/// Static metadata describing one statistic type.
///
/// Built once with the `with_*` methods and then only read.
///
/// # Examples
///
/// ```rust
/// use adqstat::StageDescriptor;
/// use adqstat::category::{ColumnCount, DataLevel, FileLevel};
///
/// let descriptor = StageDescriptor::new("DTG by plant", "MWh")
///     .with_description("Energy generated by all the clusters")
///     .with_data_level(DataLevel::AREA)
///     .with_file_level(FileLevel::DETAILS)
///     .with_column_count(ColumnCount::Dynamic);
///
/// assert_eq!(descriptor.id().as_str(), "DTG by plant");
/// assert_eq!(descriptor.columns_for(4), 4);
/// assert!(descriptor.matches(DataLevel::AREA, FileLevel::DETAILS));
/// assert!(!descriptor.matches(DataLevel::AREA, FileLevel::VALUES));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub caption: String,
    pub unit: String,
    pub description: String,
    pub data_level: DataLevel,
    pub file_level: FileLevel,
    pub precision: Precision,
    pub column_count: ColumnCount,
    /// Number of decimals kept when values are reported.
    pub decimal: u32,
    pub spatial_aggregate: SpatialAggregate,
    pub spatial_aggregate_mode: SpatialAggregateMode,
    pub has_intermediate_values: bool,
    pub possibly_non_applicable: bool,
    /// Across-year statistics reported for every column.
    pub results: Vec<ResultKind>,
}

impl StageDescriptor {
    /// Create a descriptor with area-level, single-column defaults.
    pub fn new(caption: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            unit: unit.into(),
            description: String::new(),
            data_level: DataLevel::AREA,
            file_level: FileLevel::VALUES,
            precision: Precision::ALL,
            column_count: ColumnCount::Fixed(1),
            decimal: 0,
            spatial_aggregate: SpatialAggregate::Sum,
            spatial_aggregate_mode: SpatialAggregateMode::EachYear,
            has_intermediate_values: true,
            possibly_non_applicable: false,
            results: vec![ResultKind::Average],
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_data_level(mut self, level: DataLevel) -> Self {
        self.data_level = level;
        self
    }

    pub fn with_file_level(mut self, level: FileLevel) -> Self {
        self.file_level = level;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_column_count(mut self, columns: ColumnCount) -> Self {
        self.column_count = columns;
        self
    }

    pub fn with_decimal(mut self, decimal: u32) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_spatial_aggregate(
        mut self,
        aggregate: SpatialAggregate,
        mode: SpatialAggregateMode,
    ) -> Self {
        self.spatial_aggregate = aggregate;
        self.spatial_aggregate_mode = mode;
        self
    }

    pub fn with_intermediate_values(mut self, has: bool) -> Self {
        self.has_intermediate_values = has;
        self
    }

    pub fn with_possibly_non_applicable(mut self, possibly: bool) -> Self {
        self.possibly_non_applicable = possibly;
        self
    }

    pub fn with_results(mut self, results: Vec<ResultKind>) -> Self {
        self.results = results;
        self
    }

    /// Identifier of the stage this descriptor belongs to.
    pub fn id(&self) -> StageId {
        StageId::from_str(&self.caption)
    }

    /// `true` if the stage participates in reports of the given levels.
    pub fn matches(&self, data_level: DataLevel, file_level: FileLevel) -> bool {
        self.data_level.intersects(data_level) && self.file_level.intersects(file_level)
    }

    /// Number of columns for `enabled_entities` enabled entities.
    pub fn columns_for(&self, enabled_entities: usize) -> usize {
        self.column_count.resolve(enabled_entities)
    }

    /// Number of reported statistics: columns times result kinds.
    pub fn statistics_count(&self, enabled_entities: usize) -> usize {
        self.columns_for(enabled_entities) * self.results.len()
    }

    /// Round `value` to the descriptor's decimal places.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use adqstat::StageDescriptor;
    ///
    /// let descriptor = StageDescriptor::new("NODU by plant", "-").with_decimal(2);
    /// assert_eq!(descriptor.round(1.23456), 1.23);
    /// ```
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimal as i32);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let d = StageDescriptor::new("X", "u");
        assert_eq!(d.columns_for(10), 1);
        assert_eq!(d.statistics_count(10), 1);
        assert_eq!(d.round(2.6), 3.0);
    }

    #[test]
    fn test_statistics_count_with_several_results() {
        let d = StageDescriptor::new("X", "u")
            .with_column_count(ColumnCount::Dynamic)
            .with_results(vec![ResultKind::Average, ResultKind::Min, ResultKind::Max]);
        assert_eq!(d.statistics_count(4), 12);
        assert_eq!(d.statistics_count(0), 0);
    }

    #[test]
    fn test_link_stage_does_not_match_area_query() {
        let d = StageDescriptor::new("Flow", "MWh").with_data_level(DataLevel::LINK);
        assert!(!d.matches(DataLevel::AREA, FileLevel::ALL));
        assert!(d.matches(DataLevel::ALL, FileLevel::VALUES));
    }
}
