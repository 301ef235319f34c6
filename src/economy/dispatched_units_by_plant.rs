//! Number of dispatched units of each thermal cluster ("NODU by plant").

use crate::category::{
    ColumnCount, DataLevel, FileLevel, Precision, SpatialAggregate, SpatialAggregateMode,
};
use crate::descriptor::StageDescriptor;
use crate::error::VariableError;
use crate::grid::SlotGrid;
use crate::intermediate::IntermediateValues;
use crate::stage::{SlotYearMap, Stage, VariableBase};
use crate::state::{ScratchField, State};
use crate::study::{Area, Study, ThermalCluster};
use crate::survey::SurveySink;

const READS: [ScratchField; 1] = [ScratchField::ThermalClusterProductionForYear];

/// Units needed to produce `production` with the cluster's nominal capacity.
pub fn dispatched_units(cluster: &ThermalCluster, production: f64) -> f64 {
    if cluster.nominal_capacity <= 0.0 || production <= 0.0 {
        return 0.0;
    }
    (production / cluster.nominal_capacity)
        .ceil()
        .min(f64::from(cluster.unit_count))
}

/// Hourly count of dispatched units, derived at year end from the
/// production the "DTG by plant" stage leaves in the cluster scratch.
#[derive(Debug, Clone)]
pub struct DispatchedUnitsByPlant {
    base: VariableBase,
    values_for_the_current_year: SlotGrid<IntermediateValues>,
}

impl DispatchedUnitsByPlant {
    pub fn new() -> Self {
        let descriptor = StageDescriptor::new("NODU by plant", "-")
            .with_description("Number of dispatched units")
            .with_data_level(DataLevel::AREA)
            .with_file_level(FileLevel::DETAILS)
            .with_precision(Precision::ALL)
            .with_column_count(ColumnCount::Dynamic)
            .with_decimal(0)
            .with_spatial_aggregate(SpatialAggregate::Sum, SpatialAggregateMode::EachYear)
            .with_possibly_non_applicable(true);
        Self {
            base: VariableBase::new(descriptor),
            values_for_the_current_year: SlotGrid::empty(),
        }
    }

    pub fn base(&self) -> &VariableBase {
        &self.base
    }
}

impl Default for DispatchedUnitsByPlant {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for DispatchedUnitsByPlant {
    fn descriptor(&self) -> &StageDescriptor {
        &self.base.descriptor
    }

    fn scratch_reads(&self) -> &[ScratchField] {
        &READS
    }

    fn initialize_from_study(&mut self, study: &Study) -> Result<(), VariableError> {
        self.base.initialize_from_study(study)
    }

    fn initialize_from_area(&mut self, _study: &Study, area: &Area) -> Result<(), VariableError> {
        let count = area.thermal.enabled_count();
        if !self.base.begin_allocation(area)? {
            for slot in 0..self.base.nb_years_parallel {
                self.year_begin(0, slot);
            }
            return Ok(());
        }
        let values = self.base.allocate_values(count)?;
        self.base.record_area(area)?;
        self.values_for_the_current_year = values;
        Ok(())
    }

    fn verify_area(&self, area: &Area) -> Result<(), VariableError> {
        self.base.verify_area(area)
    }

    fn year_begin(&mut self, _year: u32, slot: usize) {
        for values in self.values_for_the_current_year.slot_mut(slot) {
            values.reset();
        }
    }

    fn year_end_build_for_each_thermal_cluster(
        &mut self,
        state: &State<'_>,
        _year: u32,
        slot: usize,
    ) {
        let Some(cluster) = state.thermal_cluster else {
            return;
        };
        let range = self.base.hour_range;
        let production = state.scratch.field(ScratchField::ThermalClusterProductionForYear);
        let values = &mut self.values_for_the_current_year[(slot, cluster.area_wide_index)];
        for hour in range.first..=range.last {
            values.accumulate(hour, dispatched_units(cluster, production[hour]));
        }
    }

    fn year_end(&mut self, _year: u32, slot: usize) {
        for values in self.values_for_the_current_year.slot_mut(slot) {
            values.compute_statistics_for_current_year();
        }
    }

    fn check_summary(
        &self,
        slot_to_year: &SlotYearMap,
        slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        self.base.check_summary(slot_to_year, slots_in_batch)
    }

    fn compute_summary(
        &mut self,
        slot_to_year: &SlotYearMap,
        slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        self.base
            .compute_summary(&self.values_for_the_current_year, slot_to_year, slots_in_batch)
    }

    fn build_digest(
        &self,
        sink: &mut dyn SurveySink,
        file_level: FileLevel,
        data_level: DataLevel,
    ) {
        self.base.emit_digest(sink, file_level, data_level);
    }

    fn local_build_annual_survey_report(
        &self,
        sink: &mut dyn SurveySink,
        _file_level: FileLevel,
        precision: Precision,
        slot: usize,
    ) {
        self.base
            .emit_year(sink, &self.values_for_the_current_year, precision, slot);
    }

    fn memory_usage(&self) -> u64 {
        self.values_for_the_current_year.len() as u64 * IntermediateValues::memory_usage()
            + self.base.results_memory_usage()
    }

    fn column_count(&self) -> usize {
        self.base.entity_count()
    }

    fn column_names(&self) -> &[String] {
        self.base.column_names()
    }

    fn retrieve_raw_hourly_values_for_current_year(
        &self,
        column: usize,
        slot: usize,
    ) -> Option<&[f64]> {
        self.values_for_the_current_year
            .get(slot, column)
            .map(|v| v.hour.as_slice())
    }

    fn release(&mut self) {
        self.values_for_the_current_year = SlotGrid::empty();
        self.base.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::StudySettings;

    #[test]
    fn test_dispatched_units() {
        let cluster = ThermalCluster::new("gas", 3, 100.0);
        assert_eq!(dispatched_units(&cluster, 0.0), 0.0);
        assert_eq!(dispatched_units(&cluster, 100.0), 1.0);
        assert_eq!(dispatched_units(&cluster, 101.0), 2.0);
        assert_eq!(dispatched_units(&cluster, 1000.0), 3.0);

        let no_capacity = ThermalCluster::new("idle", 3, 0.0);
        assert_eq!(dispatched_units(&no_capacity, 50.0), 0.0);
    }

    #[test]
    fn test_reader_hook_consumes_scratch() {
        let mut study = Study::new(StudySettings::default()).unwrap();
        let a = study.add_area("fr");
        study.areas[a].thermal.add(ThermalCluster::new("gas", 4, 50.0));

        let mut stage = DispatchedUnitsByPlant::new();
        stage.initialize_from_study(&study).unwrap();
        stage.initialize_from_area(&study, &study.areas[a]).unwrap();

        let mut state = State::new(&study);
        state.select_area(&study.areas[a]);
        let cluster = study.areas[a].thermal.each_enabled().next().unwrap();
        state.begin_thermal_cluster(cluster);
        state.scratch.thermal_cluster_production_for_year[10] = 120.0;

        stage.year_end_build_for_each_thermal_cluster(&state, 0, 0);
        stage.year_end(0, 0);

        let hours = stage.retrieve_raw_hourly_values_for_current_year(0, 0).unwrap();
        assert_eq!(hours[10], 3.0);
        assert_eq!(hours[11], 0.0);
        assert_eq!(stage.values_for_the_current_year[(0, 0)].max, 3.0);
    }

    #[test]
    fn test_declares_production_read() {
        let stage = DispatchedUnitsByPlant::new();
        assert_eq!(stage.scratch_reads(), &[ScratchField::ThermalClusterProductionForYear]);
        assert!(stage.scratch_writes().is_empty());
    }

    #[test]
    fn test_area_without_clusters_is_non_applicable() {
        let mut study = Study::new(StudySettings::default()).unwrap();
        let a = study.add_area("be");
        let mut stage = DispatchedUnitsByPlant::new();
        stage.initialize_from_study(&study).unwrap();
        stage.initialize_from_area(&study, &study.areas[a]).unwrap();
        assert!(stage.base().is_non_applicable);
    }
}
