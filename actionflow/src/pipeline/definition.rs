//! What an action runs.

use crate::config::ActionConfig;
use crate::core::Operation;
use std::sync::Arc;

/// The operations and settings behind one named action.
#[derive(Debug, Clone, Default)]
pub struct ActionDefinition {
    operations: Vec<Arc<Operation>>,
    config: ActionConfig,
}

impl ActionDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(Arc::new(operation));
        self
    }

    /// Appends an operation shared with other definitions.
    #[must_use]
    pub fn with_shared_operation(mut self, operation: Arc<Operation>) -> Self {
        self.operations.push(operation);
        self
    }

    /// Sets the timeout in milliseconds. Zero disables it.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ActionConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the operations in execution order.
    #[must_use]
    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ActionConfig {
        &self.config
    }
}
