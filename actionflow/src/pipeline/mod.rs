//! Pipeline definition and execution.
//!
//! This module provides:
//! - Action definitions (operations plus configuration)
//! - The rollback stack unwound on failure
//! - The executor that drives a run end to end

mod definition;
mod executor;
mod rollback;

pub use definition::ActionDefinition;
pub use executor::{ExecutionOutcome, PipelineExecutor};
pub use rollback::RollbackStack;
