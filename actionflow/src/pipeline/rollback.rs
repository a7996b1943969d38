//! The rollback stack of a single run.

use crate::core::{ActionResult, Operation};
use crate::errors::ActionflowError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Operations whose compensating actions are pending, in registration order.
///
/// Entries are shared references to the caller's operations. Unwinding runs
/// them last-registered first.
#[derive(Debug, Default)]
pub struct RollbackStack {
    entries: Vec<Arc<Operation>>,
}

impl RollbackStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation.
    pub fn register(&mut self, operation: Arc<Operation>) {
        self.entries.push(operation);
    }

    /// Removes the most recent registration of `operation`.
    ///
    /// Returns true if an entry was removed.
    pub fn unregister(&mut self, operation: &Arc<Operation>) -> bool {
        match self.entries.iter().rposition(|entry| Arc::ptr_eq(entry, operation)) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops every pending entry without running it.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the pending operation names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|op| op.name().to_string()).collect()
    }

    /// Runs every pending compensating action in reverse registration order.
    ///
    /// The stack is emptied first. The first failing compensation stops the
    /// unwind; the remaining entries are not run. Returns how many
    /// compensations ran to completion.
    pub async fn unwind(&mut self, result: &Arc<ActionResult>) -> Result<usize, ActionflowError> {
        let entries = std::mem::take(&mut self.entries);
        let mut completed = 0;

        for operation in entries.iter().rev() {
            let Some(compensate) = operation.compensate(Arc::clone(result)) else {
                continue;
            };

            debug!(operation = %operation.name(), "Rolling back");
            match tokio::spawn(compensate).await {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => {
                    warn!(operation = %operation.name(), "Rollback failed: {}", e);
                    return Err(ActionflowError::rollback(operation.name(), e));
                }
                Err(join_err) => {
                    warn!(operation = %operation.name(), "Rollback task failed: {}", join_err);
                    return Err(ActionflowError::rollback(
                        operation.name(),
                        anyhow::anyhow!("compensating action panicked: {join_err}"),
                    ));
                }
            }
        }

        Ok(completed)
    }
}
