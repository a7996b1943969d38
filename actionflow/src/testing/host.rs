//! A host that records every hook invocation.

use super::EventLog;
use crate::core::ActionResult;
use crate::errors::ActionflowError;
use crate::guard::HostId;
use crate::hooks::{ExecutionHooks, TelemetryReporter};
use crate::host::{ActionHost, ResultSlot};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Recorded {
    errors: Mutex<Vec<ActionflowError>>,
    handled_results: Mutex<Vec<Option<Arc<ActionResult>>>>,
}

/// An [`ActionHost`] that logs `started`, `finished`, `timeout`,
/// `error:<kind>` and `handle_result` to an [`EventLog`].
pub struct RecordingHost {
    id: HostId,
    hooks: ExecutionHooks,
    slot: ResultSlot,
    log: EventLog,
    recorded: Arc<Recorded>,
}

impl RecordingHost {
    /// Creates a host with default behavior: no unhandled-error hook, no
    /// timeout hook, no telemetry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    /// Starts configuring a host.
    #[must_use]
    pub fn builder() -> RecordingHostBuilder {
        RecordingHostBuilder::default()
    }

    /// Returns the event log.
    #[must_use]
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    /// Returns how often `notify_started` ran.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.log.count("started")
    }

    /// Returns how often `notify_finished` ran.
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.log.count("finished")
    }

    /// Returns how often `on_timeout` ran.
    #[must_use]
    pub fn timeout_count(&self) -> usize {
        self.log.count("timeout")
    }

    /// Returns every error offered to `on_unhandled_error`.
    #[must_use]
    pub fn offered_errors(&self) -> Vec<ActionflowError> {
        self.recorded.errors.lock().clone()
    }

    /// Returns every value passed to `handle_result`.
    #[must_use]
    pub fn handled_results(&self) -> Vec<Option<Arc<ActionResult>>> {
        self.recorded.handled_results.lock().clone()
    }
}

impl std::fmt::Debug for RecordingHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHost")
            .field("id", &self.id)
            .field("events", &self.log.entries())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ActionHost for RecordingHost {
    fn host_id(&self) -> HostId {
        self.id
    }

    fn hooks(&self) -> &ExecutionHooks {
        &self.hooks
    }

    fn set_result(&self, result: Option<Arc<ActionResult>>) {
        self.slot.set(result);
    }

    fn result(&self) -> Option<Arc<ActionResult>> {
        self.slot.get()
    }

    async fn handle_result(&self, result: Option<Arc<ActionResult>>) {
        self.log.push("handle_result");
        self.recorded.handled_results.lock().push(result);
    }
}

/// Builder for [`RecordingHost`].
#[derive(Default)]
pub struct RecordingHostBuilder {
    log: Option<EventLog>,
    started_delay: Option<Duration>,
    fail_notify_started: bool,
    fail_notify_finished: bool,
    error_policy: Option<bool>,
    timeout_hook: bool,
    telemetry: Option<Arc<dyn TelemetryReporter>>,
}

impl RecordingHostBuilder {
    /// Logs into an existing event log.
    #[must_use]
    pub fn log(mut self, log: &EventLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    /// Makes `notify_started` sleep before returning.
    #[must_use]
    pub const fn started_delay(mut self, delay: Duration) -> Self {
        self.started_delay = Some(delay);
        self
    }

    /// Makes `notify_started` fail.
    #[must_use]
    pub const fn fail_notify_started(mut self) -> Self {
        self.fail_notify_started = true;
        self
    }

    /// Makes `notify_finished` fail.
    #[must_use]
    pub const fn fail_notify_finished(mut self) -> Self {
        self.fail_notify_finished = true;
        self
    }

    /// Installs an unhandled-error hook answering `handled`.
    #[must_use]
    pub const fn handle_errors(mut self, handled: bool) -> Self {
        self.error_policy = Some(handled);
        self
    }

    /// Installs an `on_timeout` hook.
    #[must_use]
    pub const fn with_timeout_hook(mut self) -> Self {
        self.timeout_hook = true;
        self
    }

    /// Installs a telemetry reporter.
    #[must_use]
    pub fn telemetry(mut self, reporter: Arc<dyn TelemetryReporter>) -> Self {
        self.telemetry = Some(reporter);
        self
    }

    /// Builds the host.
    #[must_use]
    pub fn build(self) -> Arc<RecordingHost> {
        let log = self.log.unwrap_or_default();
        let recorded = Arc::new(Recorded::default());

        let started_log = log.clone();
        let started_delay = self.started_delay;
        let fail_started = self.fail_notify_started;
        let finished_log = log.clone();
        let fail_finished = self.fail_notify_finished;

        let mut hooks = ExecutionHooks::builder()
            .notify_started(move || {
                let log = started_log.clone();
                async move {
                    log.push("started");
                    if let Some(delay) = started_delay {
                        tokio::time::sleep(delay).await;
                    }
                    if fail_started {
                        anyhow::bail!("busy indicator unavailable");
                    }
                    Ok(())
                }
            })
            .notify_finished(move || {
                let log = finished_log.clone();
                async move {
                    log.push("finished");
                    if fail_finished {
                        anyhow::bail!("busy indicator stuck");
                    }
                    Ok(())
                }
            });

        if self.timeout_hook {
            let timeout_log = log.clone();
            // Logged outside the future so an early call is visible.
            hooks = hooks.on_timeout(move || {
                timeout_log.push("timeout");
                async {}
            });
        }

        if let Some(handled) = self.error_policy {
            let error_log = log.clone();
            let errors = Arc::clone(&recorded);
            hooks = hooks.on_unhandled_error(move |error| {
                let log = error_log.clone();
                let errors = Arc::clone(&errors);
                async move {
                    log.push(format!("error:{}", error.kind()));
                    errors.errors.lock().push(error);
                    handled
                }
            });
        }

        if let Some(reporter) = self.telemetry {
            hooks = hooks.telemetry(reporter);
        }

        let hooks = match hooks.build() {
            Ok(hooks) => hooks,
            Err(e) => unreachable!("both notification hooks are always set: {e}"),
        };

        Arc::new(RecordingHost {
            id: HostId::new(),
            hooks,
            slot: ResultSlot::new(),
            log,
            recorded,
        })
    }
}
