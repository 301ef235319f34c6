//! # adqstat - Multi-Year Parallel Aggregation for Adequacy Studies
//!
//! Aggregates per-hour simulation outputs into yearly statistics and
//! merges them across Monte-Carlo years:
//! - **Slot-parallel** years (each concurrent year owns one buffer slot)
//! - **Order-independent** weighted merge of finished years
//! - **Runtime pipeline** of statistic stages, configured from settings
//! - **Typed scratch** shared between stages at year end, validated once
//!
//! ## Core Concepts
//!
//! ### Stage Pipeline
//!
//! Every lifecycle event flows through the registered stages in order:
//!
//! ```text
//! [hourly dispatch] → [Stage buffers per slot] → [ResultsStore per entity] → [SurveySink]
//! ```
//!
//! 1. **Hourly hooks** accumulate the solver output of one slot
//! 2. **Year end** derives daily, weekly, monthly and annual statistics
//! 3. **Summary** merges a batch of slots under their years and weights
//! 4. **Survey reports** stream per-year and across-year records
//!
//! ## Example
//!
//! ```rust
//! use adqstat::*;
//! use adqstat::study::ThermalCluster;
//!
//! let json = r#"{ "max_years_in_parallel": 2, "nb_years": 2 }"#;
//! let settings = StudySettings::from_json(json).unwrap();
//! let mut study = Study::new(settings).unwrap();
//! let fr = study.add_area("fr");
//! study.areas[fr].thermal.add(ThermalCluster::new("gas", 1, 100.0));
//!
//! let mut pipeline = Pipeline::from_settings(&study.settings).unwrap();
//! pipeline.initialize_from_study(&study).unwrap();
//! pipeline.initialize_from_area(&study, &study.areas[fr]).unwrap();
//!
//! let mut state = State::new(&study);
//! state.select_area(&study.areas[fr]);
//! state.thermal[fr].production[0] = 10.0;
//! for slot in 0..2 {
//!     pipeline.year_begin(slot as u32, slot);
//!     for hour in 0..8760 {
//!         state.set_hour(hour);
//!         pipeline.hour_for_each_area(&state, slot);
//!     }
//!     pipeline.year_end_build(&mut state, slot as u32, slot);
//!     pipeline.year_end(slot as u32, slot);
//! }
//! pipeline.compute_summary(&SlotYearMap::from([(0, 0), (1, 1)]), 2).unwrap();
//!
//! let mut report = SurveyReport::default();
//! SurveyReportBuilder::new(&pipeline).digest(&mut report, FileLevel::DETAILS, DataLevel::AREA);
//! let dtg = report.for_stage("DTG by plant").last().unwrap();
//! assert_eq!(dtg.values, vec![10.0]);
//! ```
//!
//! ## Modules
//!
//! - [`stage_id`] - Stage identifier type
//! - [`calendar`] - Hour, day, week and month layout of a year
//! - [`category`] - Descriptor flags and result kinds
//! - [`descriptor`] - Static metadata of a stage
//! - [`intermediate`] - Yearly buffer of one entity
//! - [`numeric`] - Order-independent fixed-point sums
//! - [`results`] - Across-year merge of one entity
//! - [`grid`] - `(slot, entity)` container
//! - [`study`] - Settings, year weights, areas and clusters
//! - [`state`] - Per-hour state and year-end scratch
//! - [`stage`] - The stage contract
//! - [`economy`] - Thermal stages
//! - [`graph`] - Scratch dependency graph
//! - [`pipeline`] - Ordered stage driver
//! - [`survey`] - Survey records and sinks
//! - [`error`] - Error types

pub mod calendar;
pub mod category;
pub mod descriptor;
pub mod economy;
pub mod error;
pub mod graph;
pub mod grid;
pub mod intermediate;
pub mod numeric;
pub mod pipeline;
pub mod results;
pub mod stage;
pub mod stage_id;
pub mod state;
pub mod study;
pub mod survey;

// Re-export main types for convenience
pub use category::{DataLevel, FileLevel, Precision, ResultKind};
pub use descriptor::StageDescriptor;
pub use error::VariableError;
pub use intermediate::IntermediateValues;
pub use pipeline::Pipeline;
pub use results::ResultsStore;
pub use stage::{SlotYearMap, Stage, VariableBase};
pub use stage_id::StageId;
pub use state::State;
pub use study::{Study, StudySettings, YearWeights};
pub use survey::{SurveyRecord, SurveyReport, SurveyReportBuilder, SurveySink};

// Re-export the built-in stages
pub use economy::{create_stage, DispatchedUnitsByPlant, ProductionByDispatchablePlant};
