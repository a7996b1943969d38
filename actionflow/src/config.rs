//! Action configuration and validation.

use crate::errors::ConfigError;
use crate::hooks::ExecutionHooks;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

#[allow(clippy::expect_used)]
static ACTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.:\-]*$").expect("valid action name pattern"));

/// Per-action settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Wall-clock timeout in milliseconds. Zero disables the timeout.
    #[serde(default)]
    pub timeout_ms: u64,
}

impl ActionConfig {
    /// Creates a configuration without a timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout in milliseconds.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the timeout, truncated to whole milliseconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the timeout, or `None` when disabled.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Checks that a configured timeout has something to report to.
    pub fn validate(&self, action: &str, hooks: &ExecutionHooks) -> Result<(), ConfigError> {
        if self.timeout_ms > 0 && !hooks.can_report_timeout() {
            return Err(ConfigError::TimeoutWithoutHandler {
                action: action.to_string(),
                timeout_ms: self.timeout_ms,
            });
        }
        Ok(())
    }
}

/// Validates an action name.
///
/// Names start with a letter or underscore and may contain letters, digits,
/// `_`, `-`, `.` and `:`.
pub fn validate_action_name(name: &str) -> Result<(), ConfigError> {
    if ACTION_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidActionName(name.to_string()))
    }
}
