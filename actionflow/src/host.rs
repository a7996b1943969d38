//! The invoking entity's side of the contract.

use crate::core::ActionResult;
use crate::guard::HostId;
use crate::hooks::ExecutionHooks;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

/// An entity that triggers actions and receives their results.
///
/// In an interactive application this is typically a screen's view model:
/// its hooks show and hide busy indicators, and `handle_result` reacts to
/// what the operations produced.
#[async_trait]
pub trait ActionHost: Send + Sync {
    /// Returns the identity used for single-flight admission.
    fn host_id(&self) -> HostId;

    /// Returns the host's lifecycle hooks.
    fn hooks(&self) -> &ExecutionHooks;

    /// Stores the externally visible result of the latest run.
    fn set_result(&self, result: Option<Arc<ActionResult>>);

    /// Returns the externally visible result of the latest run.
    fn result(&self) -> Option<Arc<ActionResult>>;

    /// Reacts to the final result of a run.
    async fn handle_result(&self, result: Option<Arc<ActionResult>>);
}

/// A thread-safe result slot hosts can embed.
#[derive(Debug, Default)]
pub struct ResultSlot {
    value: RwLock<Option<Arc<ActionResult>>>,
}

impl ResultSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot.
    pub fn set(&self, result: Option<Arc<ActionResult>>) {
        *self.value.write() = result;
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> Option<Arc<ActionResult>> {
        self.value.read().clone()
    }
}
