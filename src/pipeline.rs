//! Pipeline driver module.
//!
//! Provides the `Pipeline` type, the ordered list of stages of one area.
//! Every lifecycle event is replayed to every stage in registration
//! order, which is also the order in which scratch values become visible
//! during year-end build.

use crate::category::{DataLevel, FileLevel};
use crate::economy;
use crate::error::VariableError;
use crate::graph::StageGraph;
use crate::stage::{batch_years, SlotYearMap, Stage};
use crate::stage_id::StageId;
use crate::state::{ScratchField, State};
use crate::study::{Area, Link, Study, StudySettings};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Ordered list of statistic stages.
///
/// # Examples
///
/// ```rust
/// use adqstat::{Pipeline, Study, StudySettings};
/// use adqstat::economy::ProductionByDispatchablePlant;
/// use adqstat::study::ThermalCluster;
///
/// let mut study = Study::new(StudySettings::default()).unwrap();
/// let fr = study.add_area("fr");
/// study.areas[fr].thermal.add(ThermalCluster::new("gas", 1, 100.0));
///
/// let mut pipeline = Pipeline::new();
/// pipeline.register(Box::new(ProductionByDispatchablePlant::new()));
/// pipeline.initialize_from_study(&study).unwrap();
/// pipeline.initialize_from_area(&study, &study.areas[fr]).unwrap();
///
/// assert_eq!(pipeline.len(), 1);
/// assert!(pipeline.memory_usage() > 0);
/// ```
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Build the stages named in `settings.stages`, in that order.
    pub fn from_settings(settings: &StudySettings) -> Result<Self, VariableError> {
        let mut pipeline = Self::new();
        for name in &settings.stages {
            pipeline.register(economy::create_stage(name)?);
        }
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Append a stage; it runs after every stage registered before it.
    pub fn register(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in registration order.
    pub fn stages(&self) -> impl Iterator<Item = &dyn Stage> + '_ {
        self.stages.iter().map(|s| s.as_ref() as &dyn Stage)
    }

    pub fn stage(&self, id: &str) -> Option<&dyn Stage> {
        self.stages().find(|s| s.descriptor().caption == id)
    }

    /// Stages reporting on `data_level` in `file_level` files.
    pub fn stages_for(
        &self,
        data_level: DataLevel,
        file_level: FileLevel,
    ) -> impl Iterator<Item = &dyn Stage> + '_ {
        self.stages()
            .filter(move |s| s.descriptor().matches(data_level, file_level))
    }

    /// Number of statistics reported at the given levels.
    pub fn statistics_count(&self, data_level: DataLevel, file_level: FileLevel) -> usize {
        self.stages_for(data_level, file_level)
            .map(|s| s.max_number_columns())
            .sum()
    }

    /// Check the scratch-field contract of the registered stages.
    ///
    /// Each field has at most one writer, every read field has a writer,
    /// and each writer is registered before its readers.
    pub fn validate(&self) -> Result<(), VariableError> {
        let order: Vec<StageId> = self.stages().map(|s| s.id()).collect();

        let mut seen = HashSet::new();
        for id in &order {
            if !seen.insert(id) {
                return Err(VariableError::DuplicateStage(id.clone()));
            }
        }

        let mut writers: HashMap<ScratchField, StageId> = HashMap::new();
        for stage in self.stages() {
            for &field in stage.scratch_writes() {
                if let Some(first) = writers.insert(field, stage.id()) {
                    return Err(VariableError::DuplicateScratchWriter {
                        field,
                        first,
                        second: stage.id(),
                    });
                }
            }
        }

        let mut graph = StageGraph::new();
        for id in &order {
            graph.add_node(id.clone());
        }
        for stage in self.stages() {
            for &field in stage.scratch_reads() {
                let writer = writers
                    .get(&field)
                    .ok_or_else(|| VariableError::MissingScratchWriter {
                        stage: stage.id(),
                        field,
                    })?;
                if *writer != stage.id() {
                    graph.add_dependency(stage.id(), writer.clone(), field);
                }
            }
        }
        graph.check_order(&order)?;

        info!(
            "pipeline validated: {}",
            order.iter().map(StageId::as_str).collect::<Vec<_>>().join(", ")
        );
        Ok(())
    }

    /// Validate the pipeline, then set every stage up for `study`.
    pub fn initialize_from_study(&mut self, study: &Study) -> Result<(), VariableError> {
        if study.max_years_in_parallel() < 1 {
            return Err(VariableError::InvalidSlotCount(study.max_years_in_parallel()));
        }
        self.validate()?;
        for stage in &mut self.stages {
            stage.initialize_from_study(study)?;
        }
        Ok(())
    }

    /// Size every stage for `area`.
    ///
    /// All stages with one column per entity must agree on the entity count.
    pub fn initialize_from_area(
        &mut self,
        study: &Study,
        area: &Area,
    ) -> Result<(), VariableError> {
        for stage in &mut self.stages {
            stage.initialize_from_area(study, area)?;
        }

        let mut expected: Option<usize> = None;
        for stage in self.stages_for(DataLevel::AREA, FileLevel::ALL) {
            if stage.descriptor().column_count != crate::category::ColumnCount::Dynamic {
                continue;
            }
            let found = stage.column_count();
            match expected {
                None => expected = Some(found),
                Some(expected) if expected != found => {
                    return Err(VariableError::EntityCountMismatch {
                        stage: stage.id(),
                        expected,
                        found,
                    })
                }
                Some(_) => {}
            }
        }
        debug!(
            "area {} initialised: {} stages, {} bytes",
            area.name,
            self.stages.len(),
            self.memory_usage()
        );
        Ok(())
    }

    pub fn initialize_from_link(
        &mut self,
        study: &Study,
        link: &Link,
    ) -> Result<(), VariableError> {
        for stage in &mut self.stages {
            stage.initialize_from_link(study, link)?;
        }
        Ok(())
    }

    /// Error if the enabled entities of `area` changed since initialisation.
    pub fn verify_area(&self, area: &Area) -> Result<(), VariableError> {
        for stage in self.stages() {
            stage.verify_area(area)?;
        }
        Ok(())
    }

    pub fn simulation_begin(&mut self) {
        for stage in &mut self.stages {
            stage.simulation_begin();
        }
    }

    pub fn simulation_end(&mut self) {
        for stage in &mut self.stages {
            stage.simulation_end();
        }
    }

    pub fn year_begin(&mut self, year: u32, slot: usize) {
        for stage in &mut self.stages {
            stage.year_begin(year, slot);
        }
    }

    pub fn hour_begin(&mut self, hour_in_the_year: usize) {
        for stage in &mut self.stages {
            stage.hour_begin(hour_in_the_year);
        }
    }

    pub fn hour_for_each_area(&mut self, state: &State<'_>, slot: usize) {
        for stage in &mut self.stages {
            stage.hour_for_each_area(state, slot);
        }
    }

    /// Year-end build of the area selected in `state`.
    ///
    /// For each enabled cluster the scratch is cleared, every writer hook
    /// runs, then every reader hook runs.
    pub fn year_end_build(&mut self, state: &mut State<'_>, year: u32, slot: usize) {
        if let Some(area) = state.area {
            for cluster in area.thermal.each_enabled() {
                state.begin_thermal_cluster(cluster);
                for stage in &mut self.stages {
                    stage.year_end_build_prepare_data_for_each_thermal_cluster(state, year, slot);
                }
                for stage in &mut self.stages {
                    stage.year_end_build_for_each_thermal_cluster(state, year, slot);
                }
            }
        }
        for stage in &mut self.stages {
            stage.year_end_build(state, year);
        }
    }

    pub fn year_end(&mut self, year: u32, slot: usize) {
        for stage in &mut self.stages {
            stage.year_end(year, slot);
        }
    }

    /// Merge the slots `0..slots_in_batch` into every stage's results.
    ///
    /// Every stage checks the batch before any stage merges, so an error
    /// leaves all results stores as they were.
    pub fn compute_summary(
        &mut self,
        slot_to_year: &SlotYearMap,
        slots_in_batch: usize,
    ) -> Result<(), VariableError> {
        let years = batch_years(slot_to_year, slots_in_batch)?;
        for stage in self.stages() {
            stage.check_summary(slot_to_year, slots_in_batch)?;
        }
        for stage in &mut self.stages {
            stage.compute_summary(slot_to_year, slots_in_batch)?;
        }
        info!("summary merged for years {years:?}");
        Ok(())
    }

    /// Bytes held by every stage.
    pub fn memory_usage(&self) -> u64 {
        self.stages().map(|s| s.memory_usage()).sum()
    }

    /// Release every stage's buffers.
    pub fn release(&mut self) {
        for stage in &mut self.stages {
            stage.release();
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::StageDescriptor;
    use crate::economy::{DispatchedUnitsByPlant, ProductionByDispatchablePlant};

    /// A stage that only declares scratch fields.
    struct Declaring {
        descriptor: StageDescriptor,
        writes: Vec<ScratchField>,
        reads: Vec<ScratchField>,
    }

    impl Declaring {
        fn new(name: &str, writes: Vec<ScratchField>, reads: Vec<ScratchField>) -> Self {
            Self {
                descriptor: StageDescriptor::new(name, "-"),
                writes,
                reads,
            }
        }
    }

    impl Stage for Declaring {
        fn descriptor(&self) -> &StageDescriptor {
            &self.descriptor
        }

        fn scratch_writes(&self) -> &[ScratchField] {
            &self.writes
        }

        fn scratch_reads(&self) -> &[ScratchField] {
            &self.reads
        }

        fn memory_usage(&self) -> u64 {
            7
        }
    }

    const PROD: ScratchField = ScratchField::ThermalClusterProductionForYear;

    #[test]
    fn test_from_settings_default_stages() {
        let pipeline = Pipeline::from_settings(&StudySettings::default()).unwrap();
        let names: Vec<_> = pipeline.stages().map(|s| s.id()).collect();
        assert_eq!(
            names,
            vec![StageId::from_str("DTG by plant"), StageId::from_str("NODU by plant")]
        );
    }

    #[test]
    fn test_from_settings_unknown_stage() {
        let settings = StudySettings {
            stages: vec!["LOLD".to_string()],
            ..StudySettings::default()
        };
        assert_eq!(
            Pipeline::from_settings(&settings).err(),
            Some(VariableError::UnknownStage("LOLD".to_string()))
        );
    }

    #[test]
    fn test_reader_before_writer_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(DispatchedUnitsByPlant::new()));
        pipeline.register(Box::new(ProductionByDispatchablePlant::new()));
        assert!(matches!(
            pipeline.validate(),
            Err(VariableError::ScratchReadBeforeWrite { .. })
        ));
    }

    #[test]
    fn test_reader_without_writer_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(DispatchedUnitsByPlant::new()));
        assert!(matches!(
            pipeline.validate(),
            Err(VariableError::MissingScratchWriter { .. })
        ));
    }

    #[test]
    fn test_two_writers_are_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Declaring::new("A", vec![PROD], vec![])));
        pipeline.register(Box::new(Declaring::new("B", vec![PROD], vec![])));
        assert!(matches!(
            pipeline.validate(),
            Err(VariableError::DuplicateScratchWriter { .. })
        ));
    }

    #[test]
    fn test_duplicate_stage_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Declaring::new("A", vec![], vec![])));
        pipeline.register(Box::new(Declaring::new("A", vec![], vec![])));
        assert_eq!(
            pipeline.validate(),
            Err(VariableError::DuplicateStage(StageId::from_str("A")))
        );
    }

    #[test]
    fn test_self_read_is_allowed() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Declaring::new("A", vec![PROD], vec![PROD])));
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_memory_usage_is_summed() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Box::new(Declaring::new("A", vec![], vec![])));
        pipeline.register(Box::new(Declaring::new("B", vec![], vec![])));
        assert_eq!(pipeline.memory_usage(), 14);
    }

    #[test]
    fn test_zero_slots_is_rejected_at_setup() {
        let mut study = Study::new(StudySettings::default()).unwrap();
        study.settings.max_years_in_parallel = 0;
        let mut pipeline = Pipeline::from_settings(&StudySettings::default()).unwrap();
        assert_eq!(
            pipeline.initialize_from_study(&study),
            Err(VariableError::InvalidSlotCount(0))
        );
    }
}
