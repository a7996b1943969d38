//! Error types for the actionflow pipeline.
//!
//! Configuration problems are reported through [`ConfigError`] before any work
//! starts. Everything that can go wrong while a run is in flight is an
//! [`ActionflowError`]. Both are cheap to clone so the same error can be handed
//! to a host's unhandled-error hook and still be returned to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// The main error type for actionflow runs.
#[derive(Debug, Clone, Error)]
pub enum ActionflowError {
    /// The action or its hooks are misconfigured.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An operation's forward action failed.
    #[error("Operation '{operation}' failed: {cause}")]
    Operation {
        /// The operation name.
        operation: String,
        /// The underlying failure.
        cause: Arc<anyhow::Error>,
    },

    /// An operation's forward action panicked on its worker task.
    #[error("Operation '{operation}' panicked: {message}")]
    OperationPanicked {
        /// The operation name.
        operation: String,
        /// The panic or join failure message.
        message: String,
    },

    /// The run was cancelled before an operation could start.
    #[error("Operation '{operation}' was not started: {reason}")]
    Cancelled {
        /// The operation that was prevented from starting.
        operation: String,
        /// The cancellation reason.
        reason: String,
    },

    /// The run exceeded its configured timeout.
    #[error("Action '{action}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The action name.
        action: String,
        /// The configured timeout.
        timeout_ms: u64,
    },

    /// A compensating action failed while unwinding.
    #[error("Rollback of operation '{operation}' failed: {cause}")]
    Rollback {
        /// The operation whose compensation failed.
        operation: String,
        /// The underlying failure.
        cause: Arc<anyhow::Error>,
    },

    /// The finished-notification hook failed.
    #[error("Finish notification failed: {0}")]
    FinishNotification(Arc<anyhow::Error>),

    /// The started-notification hook failed.
    #[error("Start notification failed: {0}")]
    StartNotification(Arc<anyhow::Error>),
}

impl ActionflowError {
    /// Creates an operation error from any failure.
    pub fn operation(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Operation {
            operation: operation.into(),
            cause: Arc::new(source),
        }
    }

    /// Creates a rollback error from any failure.
    pub fn rollback(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Rollback {
            operation: operation.into(),
            cause: Arc::new(source),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for configuration errors.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true for timeout errors.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns a stable machine-readable kind for this error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Operation { .. } => "OperationError",
            Self::OperationPanicked { .. } => "OperationPanicked",
            Self::Cancelled { .. } => "Cancelled",
            Self::Timeout { .. } => "Timeout",
            Self::Rollback { .. } => "RollbackError",
            Self::FinishNotification(_) => "FinishNotificationError",
            Self::StartNotification(_) => "StartNotificationError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));

        match self {
            Self::Operation { operation, .. }
            | Self::OperationPanicked { operation, .. }
            | Self::Rollback { operation, .. } => {
                map.insert("operation".to_string(), serde_json::json!(operation));
            }
            Self::Cancelled { operation, reason } => {
                map.insert("operation".to_string(), serde_json::json!(operation));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::Timeout { action, timeout_ms } => {
                map.insert("action".to_string(), serde_json::json!(action));
                map.insert("timeout_ms".to_string(), serde_json::json!(timeout_ms));
            }
            Self::Config(_) | Self::FinishNotification(_) | Self::StartNotification(_) => {}
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised while validating an action's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No started-notification hook was supplied.
    #[error("notify_started is missing: the user must be told that something is happening")]
    MissingNotifyStarted,

    /// No finished-notification hook was supplied.
    #[error("notify_finished is missing: specify what happens when the operations finish")]
    MissingNotifyFinished,

    /// A timeout was configured but nothing can react to it.
    #[error("Action '{action}' has a {timeout_ms}ms timeout but neither on_timeout nor on_unhandled_error is set")]
    TimeoutWithoutHandler {
        /// The action name.
        action: String,
        /// The configured timeout.
        timeout_ms: u64,
    },

    /// The action name is empty or contains unsupported characters.
    #[error("Invalid action name: '{0}'")]
    InvalidActionName(String),

    /// Two commands were registered under the same name.
    #[error("Duplicate action name: '{0}'")]
    DuplicateAction(String),
}
