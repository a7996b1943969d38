//! Operations: the units of work a pipeline runs in order.

use super::ActionResult;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// Future returned by forward and compensating actions.
pub type OperationFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A boxed forward or compensating action.
pub type OperationAction = Arc<dyn Fn(Arc<ActionResult>) -> OperationFuture + Send + Sync>;

/// A unit of work with a forward action and an optional compensating action.
///
/// Operations are built before a run and are shared by reference while it
/// executes, so the same `Arc<Operation>` may take part in many runs.
#[derive(Clone)]
pub struct Operation {
    name: String,
    forward: Option<OperationAction>,
    compensate: Option<OperationAction>,
    retain_rollback_on_success: bool,
}

impl Operation {
    /// Creates an operation with no actions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            forward: None,
            compensate: None,
            retain_rollback_on_success: false,
        }
    }

    /// Sets the forward action.
    #[must_use]
    pub fn with_forward<F, Fut>(mut self, forward: F) -> Self
    where
        F: Fn(Arc<ActionResult>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.forward = Some(Arc::new(move |result| Box::pin(forward(result))));
        self
    }

    /// Sets the compensating action run during rollback.
    #[must_use]
    pub fn with_compensate<F, Fut>(mut self, compensate: F) -> Self
    where
        F: Fn(Arc<ActionResult>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.compensate = Some(Arc::new(move |result| Box::pin(compensate(result))));
        self
    }

    /// Keeps the compensating action registered after the forward action
    /// succeeds, so a later failure in the same run also undoes this operation.
    #[must_use]
    pub const fn with_retained_rollback(mut self, retain: bool) -> Self {
        self.retain_rollback_on_success = retain;
        self
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if a forward action is set.
    #[must_use]
    pub const fn has_forward(&self) -> bool {
        self.forward.is_some()
    }

    /// Returns true if a compensating action is set.
    #[must_use]
    pub const fn has_compensate(&self) -> bool {
        self.compensate.is_some()
    }

    /// Returns whether the rollback stays registered after success.
    #[must_use]
    pub const fn retains_rollback(&self) -> bool {
        self.retain_rollback_on_success
    }

    pub(crate) fn forward(&self, result: Arc<ActionResult>) -> Option<OperationFuture> {
        self.forward.as_ref().map(|action| action(result))
    }

    pub(crate) fn compensate(&self, result: Arc<ActionResult>) -> Option<OperationFuture> {
        self.compensate.as_ref().map(|action| action(result))
    }
}

impl Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("has_forward", &self.has_forward())
            .field("has_compensate", &self.has_compensate())
            .field("retain_rollback_on_success", &self.retain_rollback_on_success)
            .finish()
    }
}
