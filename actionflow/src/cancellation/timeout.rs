//! Wall-clock timeout for a single run.

use super::CancellationToken;
use crate::errors::ConfigError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Reason recorded on the token when the timer fires.
pub const TIMEOUT_REASON: &str = "timeout";

/// Arms a timer that cancels the run's token and reacts to the timeout.
///
/// The timer is disarmed when the controller is dropped, so a finished run
/// can never time out afterwards. Firing is cooperative: the operation that
/// is running at that moment completes normally.
#[derive(Debug)]
pub struct TimeoutController {
    token: Arc<CancellationToken>,
    timer: Option<JoinHandle<()>>,
}

impl TimeoutController {
    /// Creates a controller that never fires.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            token: Arc::new(CancellationToken::new()),
            timer: None,
        }
    }

    /// Arms the timer.
    ///
    /// `timeout` of `None` or zero disables it. An enabled timeout without a
    /// reaction is a configuration error.
    pub fn arm(
        action: &str,
        timeout: Option<Duration>,
        reaction: Option<BoxFuture<'static, ()>>,
    ) -> Result<Self, ConfigError> {
        let Some(timeout) = timeout.filter(|t| !t.is_zero()) else {
            return Ok(Self::disabled());
        };

        let Some(reaction) = reaction else {
            return Err(ConfigError::TimeoutWithoutHandler {
                action: action.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        };

        let token = Arc::new(CancellationToken::new());
        let timer_token = Arc::clone(&token);
        let action = action.to_string();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            timer_token.cancel(TIMEOUT_REASON);
            info!(
                action = %action,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Action timed out"
            );

            // The reaction gets its own task so disarming the timer cannot
            // cut a running handler short.
            let reaction = tokio::spawn(reaction);
            if let Err(e) = reaction.await {
                warn!(action = %action, "Timeout handler failed: {}", e);
            }
        });

        Ok(Self {
            token,
            timer: Some(timer),
        })
    }

    /// Returns the token cancelled on expiry.
    #[must_use]
    pub fn token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.token)
    }

    /// Returns true once the timeout has fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true if a timer is armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Stops the timer if it has not fired yet.
    pub fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for TimeoutController {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_reaction(counter: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_disabled_never_fires() {
        let controller = TimeoutController::arm("a", None, None).unwrap();
        assert!(!controller.is_armed());

        let controller = TimeoutController::arm("a", Some(Duration::ZERO), None).unwrap();
        assert!(!controller.is_armed());
        assert!(!controller.has_fired());
    }

    #[tokio::test]
    async fn test_missing_reaction_is_config_error() {
        let err = TimeoutController::arm("save", Some(Duration::from_millis(50)), None).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TimeoutWithoutHandler {
                action: "save".to_string(),
                timeout_ms: 50,
            }
        );
    }

    #[tokio::test]
    async fn test_fires_after_timeout() {
        let counter = Arc::new(AtomicUsize::new(0));
        let controller = TimeoutController::arm(
            "a",
            Some(Duration::from_millis(20)),
            Some(counting_reaction(&counter)),
        )
        .unwrap();

        assert!(!controller.has_fired());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(controller.has_fired());
        assert_eq!(controller.token().reason().as_deref(), Some(TIMEOUT_REASON));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_disarms() {
        let counter = Arc::new(AtomicUsize::new(0));
        let controller = TimeoutController::arm(
            "a",
            Some(Duration::from_millis(20)),
            Some(counting_reaction(&counter)),
        )
        .unwrap();
        let token = controller.token();
        drop(controller);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!token.is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
