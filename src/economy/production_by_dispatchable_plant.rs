//! Energy generated by each dispatchable thermal cluster ("DTG by plant").

use crate::calendar::HOURS_PER_YEAR;
use crate::category::{
    ColumnCount, DataLevel, FileLevel, Precision, SpatialAggregate, SpatialAggregateMode,
};
use crate::descriptor::StageDescriptor;
use crate::error::VariableError;
use crate::grid::SlotGrid;
use crate::intermediate::IntermediateValues;
use crate::stage::{SlotYearMap, Stage, VariableBase};
use crate::state::{ScratchField, State};
use crate::study::{Area, Study};
use crate::survey::SurveySink;
use std::collections::TryReserveError;

const WRITES: [ScratchField; 2] = [
    ScratchField::ThermalClusterProductionForYear,
    ScratchField::ThermalClusterPMinForYear,
];

/// Hourly production of every enabled cluster of an area, per slot.
///
/// Besides the reported production, the stage keeps the minimum power of
/// each cluster for the whole year. Neither is read by other stages
/// directly: at year-end build both are copied into the cluster scratch.
#[derive(Debug, Clone)]
pub struct ProductionByDispatchablePlant {
    base: VariableBase,
    values_for_the_current_year: SlotGrid<IntermediateValues>,
    pmin_of_the_cluster_for_year: SlotGrid<Vec<f64>>,
}

impl ProductionByDispatchablePlant {
    pub fn new() -> Self {
        let descriptor = StageDescriptor::new("DTG by plant", "MWh")
            .with_description("Energy generated by all the clusters")
            .with_data_level(DataLevel::AREA)
            .with_file_level(FileLevel::DETAILS)
            .with_precision(Precision::ALL)
            .with_column_count(ColumnCount::Dynamic)
            .with_decimal(0)
            .with_spatial_aggregate(SpatialAggregate::Sum, SpatialAggregateMode::EachYear);
        Self {
            base: VariableBase::new(descriptor),
            values_for_the_current_year: SlotGrid::empty(),
            pmin_of_the_cluster_for_year: SlotGrid::empty(),
        }
    }

    pub fn base(&self) -> &VariableBase {
        &self.base
    }

    /// Minimum power of `column` for every hour of the year held in `slot`.
    pub fn pmin_for_current_year(&self, column: usize, slot: usize) -> Option<&[f64]> {
        self.pmin_of_the_cluster_for_year
            .get(slot, column)
            .map(Vec::as_slice)
    }

    /// Year statistics of `column` in `slot`.
    pub fn values(&self, column: usize, slot: usize) -> Option<&IntermediateValues> {
        self.values_for_the_current_year.get(slot, column)
    }

    fn zero_slot(&mut self, slot: usize) {
        for values in self.values_for_the_current_year.slot_mut(slot) {
            values.reset();
        }
        for pmin in self.pmin_of_the_cluster_for_year.slot_mut(slot) {
            pmin.fill(0.0);
        }
    }
}

impl Default for ProductionByDispatchablePlant {
    fn default() -> Self {
        Self::new()
    }
}

fn try_hourly_zeroes() -> Result<Vec<f64>, TryReserveError> {
    let mut hours = Vec::new();
    hours.try_reserve_exact(HOURS_PER_YEAR)?;
    hours.resize(HOURS_PER_YEAR, 0.0);
    Ok(hours)
}

impl Stage for ProductionByDispatchablePlant {
    fn descriptor(&self) -> &StageDescriptor {
        &self.base.descriptor
    }

    fn scratch_writes(&self) -> &[ScratchField] {
        &WRITES
    }

    fn initialize_from_study(&mut self, study: &Study) -> Result<(), VariableError> {
        self.base.initialize_from_study(study)
    }

    fn initialize_from_area(&mut self, _study: &Study, area: &Area) -> Result<(), VariableError> {
        let count = area.thermal.enabled_count();
        if !self.base.begin_allocation(area)? {
            for slot in 0..self.base.nb_years_parallel {
                self.zero_slot(slot);
            }
            return Ok(());
        }

        let values = self.base.allocate_values(count)?;
        let slots = self.base.nb_years_parallel;
        let pmin = SlotGrid::try_new_with(slots, count, try_hourly_zeroes).map_err(|_| {
            let bytes = std::mem::size_of::<f64>() * HOURS_PER_YEAR * count * slots;
            self.base.allocation_error(bytes as u64)
        })?;
        self.base.record_area(area)?;
        self.values_for_the_current_year = values;
        self.pmin_of_the_cluster_for_year = pmin;
        Ok(())
    }

    fn verify_area(&self, area: &Area) -> Result<(), VariableError> {
        self.base.verify_area(area)
    }

    fn year_begin(&mut self, _year: u32, slot: usize) {
        self.zero_slot(slot);
    }

    fn hour_for_each_area(&mut self, state: &State<'_>, slot: usize) {
        let Some(area) = state.area else {
            return;
        };
        debug_assert_eq!(
            area.thermal.enabled_count(),
            self.base.entity_count(),
            "enabled clusters of {} changed without re-initialisation",
            area.name
        );
        let dispatch = &state.thermal[area.index];
        let hour = state.hour_in_the_year;
        for cluster in area.thermal.each_enabled() {
            let entity = cluster.area_wide_index;
            self.values_for_the_current_year[(slot, entity)]
                .accumulate(hour, dispatch.production[entity]);
            self.pmin_of_the_cluster_for_year[(slot, entity)][hour] =
                dispatch.pmin_of_clusters[entity];
        }
    }

    fn year_end_build_prepare_data_for_each_thermal_cluster(
        &mut self,
        state: &mut State<'_>,
        _year: u32,
        slot: usize,
    ) {
        let Some(cluster) = state.thermal_cluster else {
            return;
        };
        let entity = cluster.area_wide_index;
        let range = self.base.hour_range;
        let production = &self.values_for_the_current_year[(slot, entity)].hour;
        let pmin = &self.pmin_of_the_cluster_for_year[(slot, entity)];
        for hour in range.first..=range.last {
            state.scratch.thermal_cluster_production_for_year[hour] += production[hour];
            state.scratch.thermal_cluster_pmin_for_year[hour] += pmin[hour];
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
        let cells = self.values_for_the_current_year.len() as u64;
        let hourly = (std::mem::size_of::<f64>() * HOURS_PER_YEAR) as u64;
        cells * IntermediateValues::memory_usage()
            + self.pmin_of_the_cluster_for_year.len() as u64 * hourly
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
        self.pmin_of_the_cluster_for_year = SlotGrid::empty();
        self.base.release();
    }
}
