//! A named collection of commands.

use super::ActionCommand;
use crate::errors::{ActionflowError, ConfigError};
use crate::pipeline::ExecutionOutcome;
use std::collections::BTreeMap;

/// Commands looked up by action name.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: BTreeMap<String, ActionCommand>,
}

impl CommandSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command. Names must be unique.
    pub fn insert(&mut self, command: ActionCommand) -> Result<(), ConfigError> {
        if self.commands.contains_key(command.name()) {
            return Err(ConfigError::DuplicateAction(command.name().to_string()));
        }
        self.commands.insert(command.name().to_string(), command);
        Ok(())
    }

    /// Adds a command, builder style.
    pub fn with(mut self, command: ActionCommand) -> Result<Self, ConfigError> {
        self.insert(command)?;
        Ok(self)
    }

    /// Looks up a command.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionCommand> {
        self.commands.get(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    /// Returns the number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Runs the command registered under `name`.
    ///
    /// An unknown name yields `Ok(None)`.
    pub async fn execute(
        &self,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<Option<ExecutionOutcome>, ActionflowError> {
        match self.commands.get(name) {
            Some(command) => command.execute(payload).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ActionDefinition, PipelineExecutor};
    use crate::testing::{recording_operation, EventLog, RecordingHost};
    use serde_json::json;
    use std::sync::Arc;

    fn command(name: &str, log: &EventLog, host: &Arc<RecordingHost>, executor: &Arc<PipelineExecutor>) -> ActionCommand {
        let definition = ActionDefinition::new().with_operation(recording_operation(name, log));
        ActionCommand::new(name, definition, host.clone(), Arc::clone(executor)).unwrap()
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let log = EventLog::new();
        let host = RecordingHost::builder().log(&log).build();
        let executor = Arc::new(PipelineExecutor::new());

        let mut set = CommandSet::new();
        set.insert(command("save", &log, &host, &executor)).unwrap();
        let err = set.insert(command("save", &log, &host, &executor)).unwrap_err();

        assert_eq!(err, ConfigError::DuplicateAction("save".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_by_name() {
        let log = EventLog::new();
        let host = RecordingHost::builder().log(&log).build();
        let executor = Arc::new(PipelineExecutor::new());

        let set = CommandSet::new()
            .with(command("save", &log, &host, &executor))
            .unwrap()
            .with(command("delete", &log, &host, &executor))
            .unwrap();

        assert_eq!(set.names(), vec!["delete", "save"]);
        assert!(set.get("save").is_some());

        let outcome = set.execute("delete", json!(null)).await.unwrap();
        assert!(outcome.unwrap().is_completed());
        assert_eq!(log.with_prefix("forward:"), vec!["forward:delete"]);

        assert!(set.execute("missing", json!(null)).await.unwrap().is_none());
    }
}
