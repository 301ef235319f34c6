//! Economy stages.
//!
//! Stages are registered by caption through [`create_stage`], which lets
//! settings choose the pipeline composition at runtime.

mod dispatched_units_by_plant;
mod production_by_dispatchable_plant;

pub use dispatched_units_by_plant::{dispatched_units, DispatchedUnitsByPlant};
pub use production_by_dispatchable_plant::ProductionByDispatchablePlant;

use crate::error::VariableError;
use crate::stage::Stage;

/// Captions of every stage [`create_stage`] knows.
pub const STAGE_NAMES: [&str; 2] = ["DTG by plant", "NODU by plant"];

/// Build the stage registered under `name`.
pub fn create_stage(name: &str) -> Result<Box<dyn Stage>, VariableError> {
    match name {
        "DTG by plant" => Ok(Box::new(ProductionByDispatchablePlant::new())),
        "NODU by plant" => Ok(Box::new(DispatchedUnitsByPlant::new())),
        other => Err(VariableError::UnknownStage(other.to_string())),
    }
}
