//! Named, invocable commands bound to a host.
//!
//! A command is the public face of an action: UI code calls
//! [`ActionCommand::execute`] with the user's argument and never touches the
//! executor directly.

mod set;

pub use set::CommandSet;

use crate::config::validate_action_name;
use crate::errors::ActionflowError;
use crate::host::ActionHost;
use crate::pipeline::{ActionDefinition, ExecutionOutcome, PipelineExecutor};
use std::sync::Arc;

/// An action bound to a host and an executor.
///
/// The command holds no run state of its own; every call to
/// [`execute`](Self::execute) is an independent run, subject to the
/// executor's single-flight rule for the bound host.
#[derive(Clone)]
pub struct ActionCommand {
    name: String,
    definition: Arc<ActionDefinition>,
    host: Arc<dyn ActionHost>,
    executor: Arc<PipelineExecutor>,
}

impl ActionCommand {
    /// Binds `definition` to `host` under `name`.
    pub fn new(
        name: impl Into<String>,
        definition: ActionDefinition,
        host: Arc<dyn ActionHost>,
        executor: Arc<PipelineExecutor>,
    ) -> Result<Self, ActionflowError> {
        let name = name.into();
        validate_action_name(&name)?;
        definition.config().validate(&name, host.hooks())?;

        Ok(Self {
            name,
            definition: Arc::new(definition),
            host,
            executor,
        })
    }

    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bound definition.
    #[must_use]
    pub fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    /// Returns true while a run for the bound host is in flight.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executor.is_running(self.host.host_id())
    }

    /// Returns true if an invocation now would be admitted.
    #[must_use]
    pub fn can_execute(&self) -> bool {
        !self.is_executing()
    }

    /// Runs the action with `payload`.
    ///
    /// Returns [`ExecutionOutcome::Skipped`] without doing anything if the
    /// host already has a run in flight.
    pub async fn execute(&self, payload: serde_json::Value) -> Result<ExecutionOutcome, ActionflowError> {
        self.executor
            .execute(&self.name, &self.definition, Arc::clone(&self.host), payload)
            .await
    }

    /// Runs the action on a background task.
    pub fn spawn(&self, payload: serde_json::Value) -> tokio::task::JoinHandle<Result<ExecutionOutcome, ActionflowError>> {
        let command = self.clone();
        tokio::spawn(async move { command.execute(payload).await })
    }
}

impl std::fmt::Debug for ActionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCommand")
            .field("name", &self.name)
            .field("host", &self.host.host_id())
            .field("operations", &self.definition.operations().len())
            .finish_non_exhaustive()
    }
}
