//! Error types for the aggregation pipeline.
//!
//! Every failure that can be reported at setup or summary time is a
//! variant of `VariableError`. The per-hour path has no error channel:
//! out-of-range hours or entities panic through bounds-checked indexing.

use crate::state::ScratchField;
use crate::stage_id::StageId;
use thiserror::Error;

/// Format a stage ordering path as a readable string.
fn format_stage_path(path: &[StageId]) -> String {
    if path.is_empty() {
        return String::from("(empty path)");
    }
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors raised while configuring, validating or summarising a pipeline.
///
/// # Examples
///
/// ```rust
/// use adqstat::VariableError;
///
/// let err = VariableError::InvalidSlotCount(0);
/// assert!(err.to_string().contains("slot count"));
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VariableError {
    /// The number of parallel slots is below one.
    #[error("invalid slot count {0}: at least one parallel slot is required")]
    InvalidSlotCount(usize),

    /// A stage was re-initialised with a different enabled-entity count
    /// while its buffers were still allocated.
    #[error(
        "stage {stage}: enabled entity count changed from {previous} to {requested} \
         while buffers are live"
    )]
    EntityCountChanged {
        stage: StageId,
        previous: usize,
        requested: usize,
    },

    /// The enabled entities of an area changed names, or the area itself
    /// changed, while the count stayed the same.
    #[error(
        "stage {stage}: enabled entities of area {area} changed from {previous:?} to \
         {requested:?} while buffers are live"
    )]
    EntitySetChanged {
        stage: StageId,
        area: String,
        previous: Vec<String>,
        requested: Vec<String>,
    },

    /// Two setup calls that must agree reported different entity counts.
    #[error("stage {stage}: expected {expected} entities, found {found}")]
    EntityCountMismatch {
        stage: StageId,
        expected: usize,
        found: usize,
    },

    /// Buffer allocation failed.
    #[error("stage {stage}: failed to allocate {bytes} bytes")]
    Allocation { stage: StageId, bytes: u64 },

    /// More than one stage declares it writes the same scratch field.
    #[error("scratch field {field} has two writers: {first} and {second}")]
    DuplicateScratchWriter {
        field: ScratchField,
        first: StageId,
        second: StageId,
    },

    /// A stage reads a scratch field that no stage writes.
    #[error("stage {stage} reads scratch field {field}, which no stage writes")]
    MissingScratchWriter { stage: StageId, field: ScratchField },

    /// A reader is registered before the writer of the field it reads.
    #[error(
        "stage {reader} reads scratch field {field} but is registered before its \
         writer {writer}"
    )]
    ScratchReadBeforeWrite {
        reader: StageId,
        writer: StageId,
        field: ScratchField,
    },

    /// The stage dependency graph contains a cycle.
    #[error("stage cycle detected: {}", format_stage_path(.path))]
    Cycle { path: Vec<StageId> },

    /// The same stage is registered twice in one pipeline.
    #[error("stage {0} is registered twice")]
    DuplicateStage(StageId),

    /// No stage is known under the requested name.
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// The slot-to-year map has no entry for a slot of the summary batch.
    #[error("no year mapped to slot {0}")]
    MissingSlotYear(usize),

    /// A year was merged into the results store more than once.
    #[error("year {0} has already been merged")]
    YearAlreadyMerged(u32),

    /// A year weight is negative or not finite.
    #[error("invalid weight {weight} for year {year}")]
    InvalidWeight { year: u32, weight: f64 },

    /// The study settings could not be parsed or are inconsistent.
    #[error("invalid study settings: {0}")]
    InvalidSettings(String),
}

impl From<serde_json::Error> for VariableError {
    fn from(err: serde_json::Error) -> Self {
        VariableError::InvalidSettings(err.to_string())
    }
}
