//! Survey reports.
//!
//! Stages stream `SurveyRecord`s into a `SurveySink`; how records are laid
//! out on disk is the sink's business. `SurveyReportBuilder` walks the
//! stages of a pipeline in registration order and asks each one to emit
//! its records, so every enabled entity appears exactly once per stage.

use crate::category::{DataLevel, FileLevel, Precision, ResultKind};
use crate::pipeline::Pipeline;
use crate::stage_id::StageId;
use serde::{Deserialize, Serialize};

/// What a record's values describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordKind {
    /// Values of one simulated year at one time resolution.
    Year { slot: usize, precision: Precision },
    /// Across-year annual statistics, one value per result kind.
    Digest { results: Vec<ResultKind> },
}

/// One row of a survey report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub stage: StageId,
    /// Column caption: the entity name, or the stage caption for aggregates.
    pub caption: String,
    pub unit: String,
    pub area: String,
    /// `None` for the aggregate row of a digest.
    pub entity: Option<String>,
    pub kind: RecordKind,
    pub values: Vec<f64>,
}

/// Receiver of survey records.
pub trait SurveySink {
    /// Mark whether the records that follow belong to a non-applicable stage.
    fn set_non_applicable(&mut self, _non_applicable: bool) {}

    fn record(&mut self, record: SurveyRecord);
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SurveySink for NullSink {
    fn record(&mut self, _record: SurveyRecord) {}
}

/// Sink that keeps every record in memory.
///
/// # Examples
///
/// ```rust
/// use adqstat::survey::{RecordKind, SurveyRecord, SurveyReport, SurveySink};
/// use adqstat::category::Precision;
/// use adqstat::StageId;
///
/// let mut report = SurveyReport::default();
/// report.record(SurveyRecord {
///     stage: StageId::from_str("DTG by plant"),
///     caption: "gas".into(),
///     unit: "MWh".into(),
///     area: "fr".into(),
///     entity: Some("gas".into()),
///     kind: RecordKind::Year { slot: 0, precision: Precision::ANNUAL },
///     values: vec![87600.0],
/// });
///
/// assert_eq!(report.records.len(), 1);
/// assert_eq!(report.for_stage("DTG by plant").count(), 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    pub records: Vec<SurveyRecord>,
    /// Non-applicable marker of the last stage that emitted.
    pub is_current_var_na: bool,
}

impl SurveyReport {
    pub fn for_stage<'a>(
        &'a self,
        caption: &'a str,
    ) -> impl Iterator<Item = &'a SurveyRecord> + 'a {
        self.records.iter().filter(move |r| r.stage.as_str() == caption)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SurveySink for SurveyReport {
    fn set_non_applicable(&mut self, non_applicable: bool) {
        self.is_current_var_na = non_applicable;
    }

    fn record(&mut self, record: SurveyRecord) {
        self.records.push(record);
    }
}

/// Column layout of one stage, as fixed at its last area initialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageColumns {
    pub stage: StageId,
    pub unit: String,
    pub names: Vec<String>,
}

/// Streams the reports of every stage of a pipeline.
pub struct SurveyReportBuilder<'p> {
    pipeline: &'p Pipeline,
}

impl<'p> SurveyReportBuilder<'p> {
    pub fn new(pipeline: &'p Pipeline) -> Self {
        Self { pipeline }
    }

    /// Per-year report of the year held in `slot`, for area-level stages
    /// of `file_level` that support `precision`.
    pub fn annual_survey(
        &self,
        sink: &mut dyn SurveySink,
        file_level: FileLevel,
        precision: Precision,
        slot: usize,
    ) {
        for stage in self.pipeline.stages_for(DataLevel::AREA, file_level) {
            if stage.descriptor().precision.intersects(precision) {
                stage.local_build_annual_survey_report(sink, file_level, precision, slot);
            }
        }
    }

    /// Across-year digest of every stage.
    pub fn digest(&self, sink: &mut dyn SurveySink, file_level: FileLevel, data_level: DataLevel) {
        for stage in self.pipeline.stages() {
            stage.build_digest(sink, file_level, data_level);
        }
    }

    /// Column layout of the stages matching the given levels.
    pub fn columns(&self, data_level: DataLevel, file_level: FileLevel) -> Vec<StageColumns> {
        self.pipeline
            .stages_for(data_level, file_level)
            .map(|stage| StageColumns {
                stage: stage.id(),
                unit: stage.descriptor().unit.clone(),
                names: stage.column_names().to_vec(),
            })
            .collect()
    }
}
