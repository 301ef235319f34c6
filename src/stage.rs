//! The stage contract.
//!
//! A stage is one statistic type. The pipeline replays every lifecycle
//! event to each registered stage in order; stages never call each other.
//! `VariableBase` holds the state every stage shares: its descriptor, the
//! print gate, the slot count and year weights, the recorded entity set and
//! the results stores.

use crate::category::{DataLevel, FileLevel, Precision, ResultKind, SpatialAggregateMode};
use crate::descriptor::StageDescriptor;
use crate::error::VariableError;
use crate::grid::SlotGrid;
use crate::intermediate::IntermediateValues;
use crate::results::ResultsStore;
use crate::stage_id::StageId;
use crate::state::{ScratchField, State};
use crate::study::{Area, HourRange, Link, Study, YearWeights};
use crate::survey::{RecordKind, SurveyRecord, SurveySink};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Year simulated in each parallel slot of a summary batch.
pub type SlotYearMap = BTreeMap<usize, u32>;

/// Years of the slots `0..slots_in_batch`, in slot order.
///
/// Fails on an unmapped slot or on a year held by two slots of the batch.
pub fn batch_years(
    slot_to_year: &SlotYearMap,
    slots_in_batch: usize,
) -> Result<Vec<u32>, VariableError> {
    let mut years = Vec::with_capacity(slots_in_batch);
    for slot in 0..slots_in_batch {
        let year = *slot_to_year
            .get(&slot)
            .ok_or(VariableError::MissingSlotYear(slot))?;
        if years.contains(&year) {
            return Err(VariableError::YearAlreadyMerged(year));
        }
        years.push(year);
    }
    Ok(years)
}

/// Lifecycle hooks of a statistic stage.
///
/// Every hook has a no-op default so a stage only implements the events
/// it cares about. Setup and summary hooks return errors; the hourly and
/// year-end hooks assume validated indices and panic on violations.
pub trait Stage: Send {
    /// Static metadata of this statistic.
    fn descriptor(&self) -> &StageDescriptor;

    /// Identifier used in errors, settings and reports.
    fn id(&self) -> StageId {
        self.descriptor().id()
    }

    /// Scratch fields this stage writes during year-end build.
    fn scratch_writes(&self) -> &[ScratchField] {
        &[]
    }

    /// Scratch fields this stage reads during year-end build.
    fn scratch_reads(&self) -> &[ScratchField] {
        &[]
    }

    /// Capture study-wide settings: slot count, weights, hour range, print gate.
    fn initialize_from_study(&mut self, _study: &Study) -> Result<(), VariableError> {
        Ok(())
    }

    /// Size the buffers for the enabled entities of `area`.
    ///
    /// Called again with the same entity set, it only zeroes the yearly
    /// buffers and keeps the merged results.
    fn initialize_from_area(&mut self, _study: &Study, _area: &Area) -> Result<(), VariableError> {
        Ok(())
    }

    /// Size the buffers for `link`. Area stages ignore it.
    fn initialize_from_link(&mut self, _study: &Study, _link: &Link) -> Result<(), VariableError> {
        Ok(())
    }

    /// Check that `area` still has the entity set the stage was sized for.
    fn verify_area(&self, _area: &Area) -> Result<(), VariableError> {
        Ok(())
    }

    /// Once, before the first year of the simulation.
    fn simulation_begin(&mut self) {}

    /// Once, after the last summary.
    fn simulation_end(&mut self) {}

    /// Start of `year` in `slot`; the slot's yearly buffers are zeroed.
    fn year_begin(&mut self, _year: u32, _slot: usize) {}

    /// Start of an hour, before any area is visited.
    fn hour_begin(&mut self, _hour_in_the_year: usize) {}

    /// Record the current hour of the area selected in `state`.
    fn hour_for_each_area(&mut self, _state: &State<'_>, _slot: usize) {}

    /// Writer hook run for the cluster selected in `state`.
    fn year_end_build_prepare_data_for_each_thermal_cluster(
        &mut self,
        _state: &mut State<'_>,
        _year: u32,
        _slot: usize,
    ) {
    }

    /// Reader hook run after every stage's writer hook for the same cluster.
    fn year_end_build_for_each_thermal_cluster(
        &mut self,
        _state: &State<'_>,
        _year: u32,
        _slot: usize,
    ) {
    }

    /// After every cluster of the area has been built.
    fn year_end_build(&mut self, _state: &State<'_>, _year: u32) {}

    /// Finalize the statistics of the year held in `slot`.
    fn year_end(&mut self, _year: u32, _slot: usize) {}

    /// Check that the batch can be merged without touching any store.
    fn check_summary(
        &self,
        _slot_to_year: &SlotYearMap,
        _slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        Ok(())
    }

    /// Merge the slots `0..slots_in_batch` into the results stores.
    fn compute_summary(
        &mut self,
        _slot_to_year: &SlotYearMap,
        _slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        Ok(())
    }

    /// Emit the across-year results.
    fn build_digest(
        &self,
        _sink: &mut dyn SurveySink,
        _file_level: FileLevel,
        _data_level: DataLevel,
    ) {
    }

    /// Emit the statistics of the year held in `slot`.
    fn local_build_annual_survey_report(
        &self,
        _sink: &mut dyn SurveySink,
        _file_level: FileLevel,
        _precision: Precision,
        _slot: usize,
    ) {
    }

    /// Bytes held by this stage's buffers.
    fn memory_usage(&self) -> u64 {
        0
    }

    /// Number of report columns, fixed at the last area initialisation.
    fn column_count(&self) -> usize {
        self.descriptor().columns_for(0)
    }

    /// Names of the report columns, in entity order.
    fn column_names(&self) -> &[String] {
        &[]
    }

    /// Columns times reported result kinds.
    fn max_number_columns(&self) -> usize {
        self.column_count() * self.descriptor().results.len()
    }

    /// Hourly samples of `column` for the year held in `slot`.
    fn retrieve_raw_hourly_values_for_current_year(
        &self,
        _column: usize,
        _slot: usize,
    ) -> Option<&[f64]> {
        None
    }

    /// Drop every buffer; the stage may be initialised again afterwards.
    fn release(&mut self) {}
}

/// State shared by all stages.
#[derive(Debug, Clone)]
pub struct VariableBase {
    pub descriptor: StageDescriptor,
    pub results: Vec<ResultsStore>,
    pub is_printed: bool,
    /// Set when the stage may not apply and the area has no entity.
    pub is_non_applicable: bool,
    pub nb_years_parallel: usize,
    pub year_weights: YearWeights,
    pub hour_range: HourRange,
    pub area_name: String,
    /// Spatial aggregate merged year by year; `Some` in `EachYear` mode.
    aggregate: Option<ResultsStore>,
    column_names: Vec<String>,
    /// `Some` while buffers are allocated.
    entity_count: Option<usize>,
}

fn enabled_names(area: &Area) -> Vec<String> {
    area.thermal.each_enabled().map(|c| c.name.clone()).collect()
}

impl VariableBase {
    pub fn new(descriptor: StageDescriptor) -> Self {
        Self {
            descriptor,
            results: Vec::new(),
            is_printed: true,
            is_non_applicable: false,
            nb_years_parallel: 1,
            year_weights: YearWeights::default(),
            hour_range: HourRange::default(),
            area_name: String::new(),
            aggregate: None,
            column_names: Vec::new(),
            entity_count: None,
        }
    }

    pub fn id(&self) -> StageId {
        self.descriptor.id()
    }

    /// Capture the study-wide settings every stage needs.
    pub fn initialize_from_study(&mut self, study: &Study) -> Result<(), VariableError> {
        let slots = study.max_years_in_parallel();
        if slots < 1 {
            return Err(VariableError::InvalidSlotCount(slots));
        }
        self.nb_years_parallel = slots;
        self.year_weights = study.year_weights.clone();
        self.hour_range = study.settings.hour_range;
        self.is_printed = study.settings.is_printed(&self.descriptor.caption);
        Ok(())
    }

    /// Entity count recorded at the last area initialisation; zero if none.
    pub fn entity_count(&self) -> usize {
        self.entity_count.unwrap_or(0)
    }

    pub fn is_live(&self) -> bool {
        self.entity_count.is_some()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Spatial aggregate of the merged years, in `EachYear` mode.
    pub fn aggregate(&self) -> Option<&ResultsStore> {
        self.aggregate.as_ref()
    }

    /// Decide whether buffers for the enabled entities of `area` must be allocated.
    ///
    /// Returns `Ok(false)` when the buffers are already live for the same
    /// area and entity names, and an error when they are live for another
    /// entity set.
    pub fn begin_allocation(&self, area: &Area) -> Result<bool, VariableError> {
        let Some(previous) = self.entity_count else {
            return Ok(true);
        };
        let requested = area.thermal.enabled_count();
        if previous != requested {
            return Err(VariableError::EntityCountChanged {
                stage: self.id(),
                previous,
                requested,
            });
        }
        self.verify_entity_set(area)?;
        Ok(false)
    }

    /// Error if `area` no longer has the recorded enabled entities.
    pub fn verify_area(&self, area: &Area) -> Result<(), VariableError> {
        match self.entity_count {
            Some(expected) if expected != area.thermal.enabled_count() => {
                Err(VariableError::EntityCountMismatch {
                    stage: self.id(),
                    expected,
                    found: area.thermal.enabled_count(),
                })
            }
            Some(_) => self.verify_entity_set(area),
            None => Ok(()),
        }
    }

    fn verify_entity_set(&self, area: &Area) -> Result<(), VariableError> {
        let requested = enabled_names(area);
        if area.name != self.area_name || requested != self.column_names {
            return Err(VariableError::EntitySetChanged {
                stage: self.id(),
                area: area.name.clone(),
                previous: self.column_names.clone(),
                requested,
            });
        }
        Ok(())
    }

    /// Record the entity set of `area` and allocate one results store per entity.
    pub fn record_area(&mut self, area: &Area) -> Result<(), VariableError> {
        let names = enabled_names(area);
        let mut results = Vec::new();
        results
            .try_reserve_exact(names.len())
            .map_err(|_| self.allocation_error(names.len() as u64 * HOURS_BYTES))?;
        for _ in 0..names.len() {
            results.push(ResultsStore::try_new().map_err(|_| self.allocation_error(HOURS_BYTES))?);
        }
        let aggregate = match self.descriptor.spatial_aggregate_mode {
            SpatialAggregateMode::EachYear if !names.is_empty() => {
                Some(ResultsStore::try_new().map_err(|_| self.allocation_error(HOURS_BYTES))?)
            }
            _ => None,
        };
        debug!(
            "{}: {} enabled entities in area {} over {} slots",
            self.descriptor.caption,
            names.len(),
            area.name,
            self.nb_years_parallel
        );
        self.results = results;
        self.aggregate = aggregate;
        self.is_non_applicable = self.descriptor.possibly_non_applicable && names.is_empty();
        self.entity_count = Some(names.len());
        self.column_names = names;
        self.area_name = area.name.clone();
        Ok(())
    }

    pub fn allocation_error(&self, bytes: u64) -> VariableError {
        VariableError::Allocation {
            stage: self.id(),
            bytes,
        }
    }

    /// Allocate a zeroed `(slot, entity)` grid of yearly buffers.
    pub fn allocate_values(
        &self,
        entities: usize,
    ) -> Result<SlotGrid<IntermediateValues>, VariableError> {
        let slots = self.nb_years_parallel;
        SlotGrid::try_new_with(slots, entities, IntermediateValues::try_new).map_err(|_| {
            self.allocation_error(IntermediateValues::memory_usage() * (entities * slots) as u64)
        })
    }

    /// Check that every slot of the batch is mapped and that no selected
    /// year of the batch is already merged.
    pub fn check_summary(
        &self,
        slot_to_year: &SlotYearMap,
        slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        let years = batch_years(slot_to_year, slots_in_batch)?;
        if let Some(store) = self.results.first() {
            if let Some(&year) = years.iter().find(|&&year| store.contains_year(year)) {
                return Err(VariableError::YearAlreadyMerged(year));
            }
        }
        Ok(())
    }

    /// Merge the yearly buffers of the batch into the results stores.
    ///
    /// The whole batch is checked first, so an error leaves every store
    /// untouched.
    pub fn compute_summary(
        &mut self,
        values: &SlotGrid<IntermediateValues>,
        slot_to_year: &SlotYearMap,
        slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        self.check_summary(slot_to_year, slots_in_batch)?;
        if self.entity_count() == 0 {
            return Ok(());
        }
        for (slot, year) in batch_years(slot_to_year, slots_in_batch)?.into_iter().enumerate() {
            let Some(weight) = self.year_weights.weight(year) else {
                warn!(
                    "{}: year {year} is not selected, skipping slot {slot}",
                    self.descriptor.caption
                );
                continue;
            };
            let yearly = values.slot(slot);
            for (store, entity) in self.results.iter_mut().zip(yearly) {
                store.merge(year, weight, entity)?;
            }
            if self.aggregate.is_some() {
                let combined = self.spatial_aggregate_of(yearly);
                if let Some(aggregate) = self.aggregate.as_mut() {
                    aggregate.merge(year, weight, &combined)?;
                }
            }
        }
        Ok(())
    }

    /// Hour by hour spatial aggregate of one year's entity buffers.
    fn spatial_aggregate_of(&self, entities: &[IntermediateValues]) -> IntermediateValues {
        let mut combined = IntermediateValues::new();
        for values in entities {
            for (sum, &sample) in combined.hour.iter_mut().zip(&values.hour) {
                *sum += sample;
            }
        }
        for sample in combined.hour.iter_mut() {
            *sample = self.descriptor.spatial_aggregate.finish(*sample, entities.len());
        }
        combined.compute_statistics_for_current_year();
        combined
    }

    /// Bytes of the results stores.
    pub fn results_memory_usage(&self) -> u64 {
        self.results
            .iter()
            .chain(&self.aggregate)
            .map(ResultsStore::memory_usage)
            .sum()
    }

    /// Emit one record per entity with the `slot` buffer at `precision`.
    pub fn emit_year(
        &self,
        sink: &mut dyn SurveySink,
        values: &SlotGrid<IntermediateValues>,
        precision: Precision,
        slot: usize,
    ) {
        sink.set_non_applicable(self.is_non_applicable);
        if !self.is_printed || !self.descriptor.has_intermediate_values {
            return;
        }
        for (entity, name) in self.column_names.iter().enumerate() {
            let period = values[(slot, entity)].period_values(precision);
            sink.record(SurveyRecord {
                stage: self.id(),
                caption: name.clone(),
                unit: self.descriptor.unit.clone(),
                area: self.area_name.clone(),
                entity: Some(name.clone()),
                kind: RecordKind::Year { slot, precision },
                values: period.iter().map(|&v| self.descriptor.round(v)).collect(),
            });
        }
    }

    /// Across-year statistic of the whole entity set.
    ///
    /// `EachYear` reads the store merged from yearly aggregates;
    /// `PostProcessing` aggregates the per-entity statistics.
    fn aggregate_value(&self, kind: ResultKind) -> f64 {
        match &self.aggregate {
            Some(aggregate) => aggregate.value(kind),
            None => {
                let per_entity: Vec<f64> = self.results.iter().map(|r| r.value(kind)).collect();
                self.descriptor.spatial_aggregate.apply(&per_entity)
            }
        }
    }

    /// Emit the across-year statistics: one aggregate row, then one row per entity.
    pub fn emit_digest(
        &self,
        sink: &mut dyn SurveySink,
        file_level: FileLevel,
        data_level: DataLevel,
    ) {
        if !self.is_printed
            || !self.descriptor.matches(data_level, file_level)
            || self.column_names.is_empty()
        {
            return;
        }
        sink.set_non_applicable(self.is_non_applicable);
        let kinds = &self.descriptor.results;
        sink.record(SurveyRecord {
            stage: self.id(),
            caption: self.descriptor.caption.clone(),
            unit: self.descriptor.unit.clone(),
            area: self.area_name.clone(),
            entity: None,
            kind: RecordKind::Digest { results: kinds.clone() },
            values: kinds
                .iter()
                .map(|&kind| self.descriptor.round(self.aggregate_value(kind)))
                .collect(),
        });
        for (name, store) in self.column_names.iter().zip(&self.results) {
            sink.record(SurveyRecord {
                stage: self.id(),
                caption: name.clone(),
                unit: self.descriptor.unit.clone(),
                area: self.area_name.clone(),
                entity: Some(name.clone()),
                kind: RecordKind::Digest { results: kinds.clone() },
                values: kinds.iter().map(|&k| self.descriptor.round(store.value(k))).collect(),
            });
        }
    }

    /// Forget the entity set so the stage can be initialised again.
    pub fn release(&mut self) {
        self.results = Vec::new();
        self.aggregate = None;
        self.column_names = Vec::new();
        self.is_non_applicable = false;
        self.entity_count = None;
    }
}

const HOURS_BYTES: u64 = (crate::calendar::HOURS_PER_YEAR * std::mem::size_of::<f64>()) as u64;
