//! Lifecycle hooks supplied by the invoking entity.
//!
//! Hooks are collected into an [`ExecutionHooks`] value through
//! [`ExecutionHooksBuilder`], which rejects a missing `notify_started` or
//! `notify_finished` up front instead of failing in the middle of a run.

mod telemetry;

pub use telemetry::{
    CollectingTelemetryReporter, LoggingTelemetryReporter, NoOpTelemetryReporter,
    TelemetryReporter,
};
pub(crate) use telemetry::spawn_track_event;

#[cfg(test)]
pub use telemetry::MockTelemetryReporter;

use crate::errors::{ActionflowError, ConfigError};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// A started/finished notification hook.
pub type ActivityHook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A timeout hook.
pub type TimeoutHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// An unhandled-error hook. Resolves to `true` when the error was handled.
pub type ErrorHook = Arc<dyn Fn(ActionflowError) -> BoxFuture<'static, bool> + Send + Sync>;

/// Validated set of hooks for one invoking entity.
#[derive(Clone)]
pub struct ExecutionHooks {
    notify_started: ActivityHook,
    notify_finished: ActivityHook,
    on_timeout: Option<TimeoutHook>,
    on_unhandled_error: Option<ErrorHook>,
    telemetry: Option<Arc<dyn TelemetryReporter>>,
}

impl ExecutionHooks {
    /// Starts building a hook set.
    #[must_use]
    pub fn builder() -> ExecutionHooksBuilder {
        ExecutionHooksBuilder::default()
    }

    /// Returns true if a timeout can be reported through either handler.
    #[must_use]
    pub const fn can_report_timeout(&self) -> bool {
        self.on_timeout.is_some() || self.on_unhandled_error.is_some()
    }

    /// Returns true if an unhandled-error hook is configured.
    #[must_use]
    pub const fn has_unhandled_error_hook(&self) -> bool {
        self.on_unhandled_error.is_some()
    }

    /// Returns the telemetry reporter, if any.
    #[must_use]
    pub fn telemetry(&self) -> Option<Arc<dyn TelemetryReporter>> {
        self.telemetry.clone()
    }

    pub(crate) async fn notify_started(&self) -> anyhow::Result<()> {
        (self.notify_started)().await
    }

    pub(crate) async fn notify_finished(&self) -> anyhow::Result<()> {
        (self.notify_finished)().await
    }

    /// Offers an error to the unhandled-error hook.
    ///
    /// Returns `None` when no hook is configured, otherwise whether the hook
    /// reported the error as handled.
    pub(crate) async fn offer_error(&self, error: &ActionflowError) -> Option<bool> {
        match &self.on_unhandled_error {
            Some(hook) => Some(hook(error.clone()).await),
            None => None,
        }
    }

    /// Builds the future run when a timeout expires.
    ///
    /// `on_timeout` wins; otherwise the unhandled-error hook receives a
    /// [`ActionflowError::Timeout`] and its answer is ignored.
    pub(crate) fn timeout_reaction(
        &self,
        action: &str,
        timeout_ms: u64,
    ) -> Option<BoxFuture<'static, ()>> {
        if let Some(hook) = &self.on_timeout {
            let hook = Arc::clone(hook);
            return Some(Box::pin(async move { hook().await }));
        }

        let hook = self.on_unhandled_error.clone()?;
        let error = ActionflowError::Timeout {
            action: action.to_string(),
            timeout_ms,
        };
        Some(Box::pin(async move {
            hook(error).await;
        }))
    }
}

impl std::fmt::Debug for ExecutionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHooks")
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_unhandled_error", &self.on_unhandled_error.is_some())
            .field("telemetry", &self.telemetry.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExecutionHooks`].
#[derive(Default)]
pub struct ExecutionHooksBuilder {
    notify_started: Option<ActivityHook>,
    notify_finished: Option<ActivityHook>,
    on_timeout: Option<TimeoutHook>,
    on_unhandled_error: Option<ErrorHook>,
    telemetry: Option<Arc<dyn TelemetryReporter>>,
}

impl ExecutionHooksBuilder {
    /// Sets the hook awaited before any operation runs, e.g. to show a busy
    /// indicator. Required.
    #[must_use]
    pub fn notify_started<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.notify_started = Some(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Sets the hook awaited after all operations and rollbacks. Required.
    #[must_use]
    pub fn notify_finished<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.notify_finished = Some(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Sets the hook invoked when the run's timeout expires.
    #[must_use]
    pub fn on_timeout<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_timeout = Some(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Sets the hook offered every error the run cannot recover from itself.
    #[must_use]
    pub fn on_unhandled_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionflowError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.on_unhandled_error = Some(Arc::new(move |error| Box::pin(hook(error))));
        self
    }

    /// Sets the telemetry reporter.
    #[must_use]
    pub fn telemetry(mut self, reporter: Arc<dyn TelemetryReporter>) -> Self {
        self.telemetry = Some(reporter);
        self
    }

    /// Validates and builds the hook set.
    pub fn build(self) -> Result<ExecutionHooks, ConfigError> {
        let notify_started = self.notify_started.ok_or(ConfigError::MissingNotifyStarted)?;
        let notify_finished = self
            .notify_finished
            .ok_or(ConfigError::MissingNotifyFinished)?;

        Ok(ExecutionHooks {
            notify_started,
            notify_finished,
            on_timeout: self.on_timeout,
            on_unhandled_error: self.on_unhandled_error,
            telemetry: self.telemetry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn base() -> ExecutionHooksBuilder {
        ExecutionHooks::builder()
            .notify_started(|| async { Ok(()) })
            .notify_finished(|| async { Ok(()) })
    }

    #[test]
    fn test_missing_notify_started() {
        let err = ExecutionHooks::builder()
            .notify_finished(|| async { Ok(()) })
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingNotifyStarted);
    }

    #[test]
    fn test_missing_notify_finished() {
        let err = ExecutionHooks::builder()
            .notify_started(|| async { Ok(()) })
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingNotifyFinished);
    }

    #[tokio::test]
    async fn test_offer_error_without_hook() {
        let hooks = base().build().unwrap();
        let err = ActionflowError::cancelled("op", "timeout");

        assert!(!hooks.has_unhandled_error_hook());
        assert_eq!(hooks.offer_error(&err).await, None);
    }

    #[tokio::test]
    async fn test_offer_error_with_hook() {
        let hooks = base()
            .on_unhandled_error(|error| async move { error.is_timeout() })
            .build()
            .unwrap();

        let timeout = ActionflowError::Timeout {
            action: "a".to_string(),
            timeout_ms: 1,
        };
        assert_eq!(hooks.offer_error(&timeout).await, Some(true));

        let other = ActionflowError::cancelled("op", "x");
        assert_eq!(hooks.offer_error(&other).await, Some(false));
    }

    #[tokio::test]
    async fn test_timeout_reaction_prefers_on_timeout() {
        let timeouts = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));

        let t = timeouts.clone();
        let e = errors.clone();
        let hooks = base()
            .on_timeout(move || {
                let t = t.clone();
                async move {
                    t.fetch_add(1, Ordering::SeqCst);
                }
            })
            .on_unhandled_error(move |_| {
                let e = e.clone();
                async move {
                    e.fetch_add(1, Ordering::SeqCst);
                    true
                }
            })
            .build()
            .unwrap();

        hooks.timeout_reaction("a", 10).unwrap().await;

        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_reaction_falls_back_to_error_hook() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let s = seen.clone();
        let hooks = base()
            .on_unhandled_error(move |error| {
                let s = s.clone();
                async move {
                    *s.lock() = Some(error.kind());
                    false
                }
            })
            .build()
            .unwrap();

        hooks.timeout_reaction("a", 10).unwrap().await;

        assert_eq!(*seen.lock(), Some("Timeout"));
    }

    #[tokio::test]
    async fn test_timeout_reaction_defers_on_timeout_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let hooks = base()
            .on_timeout(move || {
                c.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .build()
            .unwrap();

        let reaction = hooks.timeout_reaction("a", 10).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        drop(reaction);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        hooks.timeout_reaction("a", 10).unwrap().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timeout_reaction_none_without_handlers() {
        let hooks = base().build().unwrap();
        assert!(!hooks.can_report_timeout());
        assert!(hooks.timeout_reaction("a", 10).is_none());
    }
}
