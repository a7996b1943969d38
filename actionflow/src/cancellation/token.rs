//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// A callback type for cancellation notifications.
pub type CancelCallback = Box<dyn FnOnce(&str) + Send + Sync>;

/// A token for cooperative cancellation.
///
/// Cancelling never interrupts work that is already running; it only tells
/// the pipeline not to start anything new. Only the first reason is kept.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    callbacks: RwLock<Vec<CancelCallback>>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// Idempotent. Callbacks run once, on the first call; a panicking
    /// callback is logged and does not stop the others.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();

        // The reason is written before the flag, both under the callbacks
        // lock, so anyone who sees the token cancelled also sees its reason.
        let callbacks = {
            let mut callbacks = self.callbacks.write();
            if self.is_cancelled() {
                return;
            }
            *self.reason.write() = Some(reason.clone());
            self.cancelled.store(true, Ordering::SeqCst);
            std::mem::take(&mut *callbacks)
        };

        for callback in callbacks {
            run_callback(callback, &reason);
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce(&str) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.write();
        if self.is_cancelled() {
            drop(callbacks);
            let reason = self.reason().unwrap_or_default();
            run_callback(Box::new(callback), &reason);
        } else {
            callbacks.push(Box::new(callback));
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

fn run_callback(callback: CancelCallback, reason: &str) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(reason))) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_token_cancel_idempotent() {
        let token = CancellationToken::new();
        token.cancel("timeout");
        token.cancel("other");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("timeout".to_string()));
    }

    #[test]
    fn test_on_cancel_runs_once() {
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        token.on_cancel(move |reason| {
            assert_eq!(reason, "timeout");
            c.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel("timeout");
        token.cancel("timeout");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_cancel_after_cancellation() {
        let token = CancellationToken::new();
        token.cancel("done");

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        token.on_cancel(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_panic_suppressed() {
        let token = CancellationToken::new();
        token.on_cancel(|_| panic!("Intentional panic"));

        token.cancel("test");
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_late_callback_panic_suppressed() {
        let token = CancellationToken::new();
        token.cancel("test");

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        token.on_cancel(|_| panic!("Intentional panic"));
        token.on_cancel(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_registration_always_sees_reason() {
        for _ in 0..50 {
            let token = Arc::new(CancellationToken::new());
            let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

            let registrars: Vec<_> = (0..4)
                .map(|_| {
                    let token = Arc::clone(&token);
                    let seen = Arc::clone(&seen);
                    std::thread::spawn(move || {
                        token.on_cancel(move |reason| seen.lock().push(reason.to_string()));
                    })
                })
                .collect();
            let canceller = {
                let token = Arc::clone(&token);
                std::thread::spawn(move || token.cancel("timeout"))
            };

            canceller.join().unwrap();
            for handle in registrars {
                handle.join().unwrap();
            }

            let seen = seen.lock();
            assert_eq!(seen.len(), 4);
            assert!(seen.iter().all(|reason| reason == "timeout"));
        }
    }
}
