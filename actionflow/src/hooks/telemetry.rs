//! Telemetry reporters.
//!
//! The pipeline reports one event per admitted run. Reporting is best effort:
//! it runs on its own task and its failures are logged, never returned.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives usage events from the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryReporter: Send + Sync {
    /// Records that an action was triggered.
    async fn track_event(&self, name: &str, message: &str) -> anyhow::Result<()>;
}

/// A reporter that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTelemetryReporter;

#[async_trait]
impl TelemetryReporter for NoOpTelemetryReporter {
    async fn track_event(&self, _name: &str, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A reporter that logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTelemetryReporter;

#[async_trait]
impl TelemetryReporter for LoggingTelemetryReporter {
    async fn track_event(&self, name: &str, message: &str) -> anyhow::Result<()> {
        info!(event_name = %name, "Telemetry: {}", message);
        Ok(())
    }
}

/// A reporter that keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingTelemetryReporter {
    events: RwLock<Vec<(String, String)>>,
}

impl CollectingTelemetryReporter {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected `(name, message)` pairs.
    #[must_use]
    pub fn events(&self) -> Vec<(String, String)> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl TelemetryReporter for CollectingTelemetryReporter {
    async fn track_event(&self, name: &str, message: &str) -> anyhow::Result<()> {
        self.events.write().push((name.to_string(), message.to_string()));
        Ok(())
    }
}

/// Reports an action activation on a background task.
///
/// The returned handle is only useful to tests; the pipeline never awaits it.
pub(crate) fn spawn_track_event(
    reporter: Arc<dyn TelemetryReporter>,
    action: &str,
) -> tokio::task::JoinHandle<()> {
    let name = action.to_string();
    let message = format!("User activated {name}");

    tokio::spawn(async move {
        match reporter.track_event(&name, &message).await {
            Ok(()) => debug!(action = %name, "Telemetry event recorded"),
            Err(e) => warn!(action = %name, "track_event({}) failed: {}", name, e),
        }
    })
}
