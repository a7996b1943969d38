//! # Actionflow
//!
//! Single-flight command execution for interactive applications.
//!
//! An action is an ordered list of operations, each with a forward action
//! and an optional compensating action. Running an action on behalf of a
//! host (typically a screen or view model) guarantees:
//!
//! - **Single flight**: a host runs at most one action at a time; a second
//!   invocation while one is in flight is dropped
//! - **Rollback**: when an operation fails, pending compensations run in
//!   reverse registration order
//! - **Cooperative timeouts**: an expired timeout is reported to the host and
//!   stops operations that have not started yet
//! - **Lifecycle hooks**: `notify_started` and `notify_finished` bracket
//!   every admitted run, whatever happens in between
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actionflow::prelude::*;
//!
//! let executor = Arc::new(PipelineExecutor::new());
//! let definition = ActionDefinition::new()
//!     .with_operation(Operation::new("save").with_forward(|result| async move {
//!         result.set_data("saved");
//!         Ok(())
//!     }))
//!     .with_timeout_ms(5_000);
//!
//! let command = ActionCommand::new("save", definition, host, executor)?;
//! let outcome = command.execute(json!({ "id": 7 })).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod command;
pub mod config;
pub mod core;
pub mod errors;
pub mod guard;
pub mod hooks;
pub mod host;
pub mod observability;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, TimeoutController};
    pub use crate::command::{ActionCommand, CommandSet};
    pub use crate::config::{validate_action_name, ActionConfig};
    pub use crate::core::{ActionResult, Operation, ResultSnapshot};
    pub use crate::errors::{ActionflowError, ConfigError};
    pub use crate::guard::{FlightPermit, HostId, SingleFlightGuard};
    pub use crate::hooks::{
        CollectingTelemetryReporter, ExecutionHooks, ExecutionHooksBuilder,
        LoggingTelemetryReporter, NoOpTelemetryReporter, TelemetryReporter,
    };
    pub use crate::host::{ActionHost, ResultSlot};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{ActionDefinition, ExecutionOutcome, PipelineExecutor};
}
