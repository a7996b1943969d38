//! The pipeline executor.
//!
//! One call to [`PipelineExecutor::execute`] is one run:
//!
//! 1. validate configuration, then ask the single-flight guard for admission
//! 2. arm the timeout, clear the host's result, report telemetry
//! 3. `notify_started`, then each operation in order with its rollback
//!    registered before the forward action starts
//! 4. on error, offer it to `on_unhandled_error`
//! 5. always: unwind pending rollbacks, publish the result, `handle_result`,
//!    `notify_finished`, release the guard

use super::{ActionDefinition, RollbackStack};
use crate::cancellation::{CancellationToken, TimeoutController};
use crate::config::validate_action_name;
use crate::core::ActionResult;
use crate::errors::ActionflowError;
use crate::guard::{FlightPermit, HostId, SingleFlightGuard};
use crate::hooks::{spawn_track_event, ExecutionHooks};
use crate::host::ActionHost;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How an execution ended, when it did not propagate an error.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Every operation succeeded.
    Completed {
        /// The final result.
        result: Option<Arc<ActionResult>>,
    },
    /// An error occurred and `on_unhandled_error` reported it as handled.
    Recovered {
        /// The final result, after rollback.
        result: Option<Arc<ActionResult>>,
        /// The handled error.
        error: ActionflowError,
    },
    /// A run for the same host was already in flight; nothing happened.
    Skipped,
}

impl ExecutionOutcome {
    /// Returns true if the invocation was dropped by the single-flight rule.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Returns true if every operation succeeded.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns the final result, if the run produced one.
    #[must_use]
    pub fn result(&self) -> Option<&Arc<ActionResult>> {
        match self {
            Self::Completed { result } | Self::Recovered { result, .. } => result.as_ref(),
            Self::Skipped => None,
        }
    }

    /// Returns the handled error of a recovered run.
    #[must_use]
    pub const fn error(&self) -> Option<&ActionflowError> {
        match self {
            Self::Recovered { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// State private to one run.
struct RunState {
    run_id: Uuid,
    payload: serde_json::Value,
    result: Option<Arc<ActionResult>>,
    rollbacks: RollbackStack,
    transaction_active: bool,
}

impl RunState {
    fn new(run_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            run_id,
            payload,
            result: None,
            rollbacks: RollbackStack::new(),
            transaction_active: false,
        }
    }

    fn ensure_result(&mut self) -> Arc<ActionResult> {
        let run_id = self.run_id;
        let payload = &self.payload;
        Arc::clone(
            self.result
                .get_or_insert_with(|| Arc::new(ActionResult::for_run(run_id, payload.clone()))),
        )
    }
}

/// Runs actions for any number of hosts, one run per host at a time.
///
/// The executor owns the single-flight state. Share one instance (behind an
/// `Arc`) between every command that must exclude the others.
#[derive(Debug, Clone, Default)]
pub struct PipelineExecutor {
    guard: SingleFlightGuard,
}

impl PipelineExecutor {
    /// Creates an executor with its own guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor over an existing guard.
    #[must_use]
    pub const fn with_guard(guard: SingleFlightGuard) -> Self {
        Self { guard }
    }

    /// Returns the single-flight guard.
    #[must_use]
    pub const fn guard(&self) -> &SingleFlightGuard {
        &self.guard
    }

    /// Returns true if a run for `host` is in flight.
    #[must_use]
    pub fn is_running(&self, host: HostId) -> bool {
        self.guard.is_active(host)
    }

    /// Executes `definition` on behalf of `host`.
    ///
    /// Configuration errors are returned before admission and have no side
    /// effects. A rejected admission returns [`ExecutionOutcome::Skipped`].
    pub async fn execute(
        &self,
        action: &str,
        definition: &ActionDefinition,
        host: Arc<dyn ActionHost>,
        payload: serde_json::Value,
    ) -> Result<ExecutionOutcome, ActionflowError> {
        validate_action_name(action)?;
        let hooks = host.hooks().clone();
        definition.config().validate(action, &hooks)?;

        let host_id = host.host_id();
        let run_id = Uuid::now_v7();
        let Some(permit) = self.guard.try_begin(host_id, run_id) else {
            debug!(action = %action, host = %host_id, "Action already running, ignoring request");
            return Ok(ExecutionOutcome::Skipped);
        };

        let span = info_span!("action_run", action = %action, host = %host_id, run_id = %run_id);
        self.run(permit, action, definition, host, hooks, payload)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        permit: FlightPermit,
        action: &str,
        definition: &ActionDefinition,
        host: Arc<dyn ActionHost>,
        hooks: ExecutionHooks,
        payload: serde_json::Value,
    ) -> Result<ExecutionOutcome, ActionflowError> {
        let started = Instant::now();
        let config = definition.config();
        let reaction = config
            .timeout()
            .and_then(|_| hooks.timeout_reaction(action, config.timeout_ms));
        let timeout = match TimeoutController::arm(action, config.timeout(), reaction) {
            Ok(timeout) => timeout,
            Err(e) => {
                drop(permit);
                return Err(e.into());
            }
        };

        let token = timeout.token();
        let action_name = action.to_string();
        token.on_cancel(move |reason| {
            warn!(
                action = %action_name,
                "Run cancelled ({}); operations not yet started will not run",
                reason
            );
        });

        host.set_result(None);
        if let Some(reporter) = hooks.telemetry() {
            spawn_track_event(reporter, action);
        }

        let mut run = RunState::new(permit.run_id(), payload);
        let mut failure: Option<ActionflowError> = None;
        let mut recovered: Option<ActionflowError> = None;

        if let Err(error) = self.run_operations(&mut run, definition, &hooks, &token).await {
            match hooks.offer_error(&error).await {
                Some(true) => {
                    info!(error = %error, "Error handled by host");
                    recovered = Some(error);
                }
                Some(false) => {
                    warn!(error = %error, "Error not handled by host");
                    failure = Some(error);
                }
                None => failure = Some(error),
            }
        }

        if run.transaction_active {
            if !run.rollbacks.is_empty() {
                debug!(pending = ?run.rollbacks.names(), "Unwinding rollbacks");
                let result = run.ensure_result();
                if let Err(e) = run.rollbacks.unwind(&result).await {
                    supersede(&mut failure, e);
                }
            }
            run.transaction_active = false;
        }

        host.set_result(run.result.clone());

        let handler_host = Arc::clone(&host);
        let final_result = run.result.clone();
        if let Err(e) = tokio::spawn(async move { handler_host.handle_result(final_result).await }).await {
            warn!("handle_result failed: {}", e);
        }

        if let Err(e) = hooks.notify_finished().await {
            let error = ActionflowError::FinishNotification(Arc::new(e));
            match hooks.offer_error(&error).await {
                Some(true) => {
                    info!(error = %error, "Finish notification error handled by host");
                    if recovered.is_none() {
                        recovered = Some(error);
                    }
                }
                _ => supersede(&mut failure, error),
            }
        }

        let timed_out = timeout.has_fired();
        drop(timeout);
        info!(
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            failed = failure.is_some(),
            recovered = recovered.is_some(),
            timed_out,
            "Action finished"
        );
        drop(permit);

        let result = run.result;
        match (failure, recovered) {
            (Some(error), _) => Err(error),
            (None, Some(error)) => Ok(ExecutionOutcome::Recovered { result, error }),
            (None, None) => Ok(ExecutionOutcome::Completed { result }),
        }
    }

    async fn run_operations(
        &self,
        run: &mut RunState,
        definition: &ActionDefinition,
        hooks: &ExecutionHooks,
        token: &CancellationToken,
    ) -> Result<(), ActionflowError> {
        hooks
            .notify_started()
            .await
            .map_err(|e| ActionflowError::StartNotification(Arc::new(e)))?;

        run.transaction_active = true;

        for operation in definition.operations() {
            run.rollbacks.register(Arc::clone(operation));
            let result = run.ensure_result();

            if operation.has_forward() {
                if token.is_cancelled() {
                    return Err(ActionflowError::cancelled(
                        operation.name(),
                        token.reason().unwrap_or_default(),
                    ));
                }

                if let Some(forward) = operation.forward(result) {
                    debug!(operation = %operation.name(), "Running operation");
                    match tokio::spawn(forward).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(ActionflowError::operation(operation.name(), e)),
                        Err(join_err) => {
                            return Err(ActionflowError::OperationPanicked {
                                operation: operation.name().to_string(),
                                message: join_err.to_string(),
                            })
                        }
                    }
                }
            }

            if !operation.retains_rollback() {
                run.rollbacks.unregister(operation);
            }
        }

        run.rollbacks.clear();
        run.transaction_active = false;
        Ok(())
    }
}

/// Replaces the pending failure, logging the one that is lost.
fn supersede(failure: &mut Option<ActionflowError>, error: ActionflowError) {
    if let Some(previous) = failure.replace(error) {
        warn!(error = %previous, "Error superseded by a later failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operation;
    use crate::testing::RecordingHost;
    use serde_json::json;

    #[tokio::test]
    async fn test_invalid_action_name_has_no_side_effects() {
        let host = RecordingHost::new();
        let executor = PipelineExecutor::new();
        let definition = ActionDefinition::new().with_operation(Operation::new("a"));

        let err = executor
            .execute("not valid", &definition, host.clone(), json!(null))
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert_eq!(host.started_count(), 0);
        assert_eq!(host.finished_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_without_handler_rejected_before_admission() {
        let host = RecordingHost::new();
        let executor = PipelineExecutor::new();
        let definition = ActionDefinition::new()
            .with_operation(Operation::new("a"))
            .with_timeout_ms(50);

        let err = executor
            .execute("save", &definition, host.clone(), json!(null))
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert!(!executor.is_running(host.host_id()));
        assert_eq!(host.started_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_operation_list_publishes_no_result() {
        let host = RecordingHost::new();
        let executor = PipelineExecutor::new();

        let outcome = executor
            .execute("noop", &ActionDefinition::new(), host.clone(), json!(1))
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert!(outcome.result().is_none());
        assert!(host.result().is_none());
        assert_eq!(host.handled_results().len(), 1);
        assert_eq!(host.finished_count(), 1);
    }

    #[tokio::test]
    async fn test_start_notification_failure_skips_operations() {
        let host = RecordingHost::builder().fail_notify_started().build();
        let executor = PipelineExecutor::new();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let r = ran.clone();
        let definition = ActionDefinition::new().with_operation(Operation::new("a").with_forward(
            move |_| {
                let r = r.clone();
                async move {
                    r.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        let err = executor
            .execute("save", &definition, host.clone(), json!(null))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "StartNotificationError");
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(host.finished_count(), 1);
        assert!(!executor.is_running(host.host_id()));
    }

    #[tokio::test]
    async fn test_operation_panic_is_reported() {
        let host = RecordingHost::new();
        let executor = PipelineExecutor::new();
        let definition = ActionDefinition::new().with_operation(
            Operation::new("explodes").with_forward(|_| async {
                if true {
                    panic!("boom");
                }
                Ok(())
            }),
        );

        let err = executor
            .execute("save", &definition, host.clone(), json!(null))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "OperationPanicked");
        assert_eq!(host.finished_count(), 1);
        assert!(!executor.is_running(host.host_id()));
    }

    #[test]
    fn test_outcome_accessors() {
        let skipped = ExecutionOutcome::Skipped;
        assert!(skipped.is_skipped());
        assert!(skipped.result().is_none());
        assert!(skipped.error().is_none());

        let recovered = ExecutionOutcome::Recovered {
            result: Some(Arc::new(ActionResult::new(json!(null)))),
            error: ActionflowError::cancelled("a", "timeout"),
        };
        assert!(!recovered.is_completed());
        assert!(recovered.result().is_some());
        assert_eq!(recovered.error().unwrap().kind(), "Cancelled");
    }
}
