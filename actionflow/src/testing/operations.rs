//! Operation builders for tests.

use crate::core::Operation;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// An append-only, shareable log of named events.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    /// Returns every entry in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Returns the entries starting with `prefix`, in order.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Counts the entries equal to `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }

    /// Returns the position of the first entry equal to `entry`.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }
}

/// An operation that logs `forward:<name>` and `compensate:<name>`.
#[must_use]
pub fn recording_operation(name: &str, log: &EventLog) -> Operation {
    let forward_log = log.clone();
    let compensate_log = log.clone();
    let forward_entry = format!("forward:{name}");
    let compensate_entry = format!("compensate:{name}");

    Operation::new(name)
        .with_forward(move |_| {
            let log = forward_log.clone();
            let entry = forward_entry.clone();
            async move {
                log.push(entry);
                Ok(())
            }
        })
        .with_compensate(move |_| {
            let log = compensate_log.clone();
            let entry = compensate_entry.clone();
            async move {
                log.push(entry);
                Ok(())
            }
        })
}

/// An operation whose forward action logs and then fails.
#[must_use]
pub fn failing_operation(name: &str, log: &EventLog) -> Operation {
    let forward_log = log.clone();
    let compensate_log = log.clone();
    let label = name.to_string();
    let compensate_entry = format!("compensate:{name}");

    Operation::new(name)
        .with_forward(move |_| {
            let log = forward_log.clone();
            let label = label.clone();
            async move {
                log.push(format!("forward:{label}"));
                Err(anyhow::anyhow!("{label} failed"))
            }
        })
        .with_compensate(move |_| {
            let log = compensate_log.clone();
            let entry = compensate_entry.clone();
            async move {
                log.push(entry);
                Ok(())
            }
        })
}

/// An operation that sleeps for `delay`, then writes `data` into the result.
#[must_use]
pub fn slow_operation(name: &str, delay: Duration, data: serde_json::Value, log: &EventLog) -> Operation {
    let forward_log = log.clone();
    let label = name.to_string();

    Operation::new(name).with_forward(move |result| {
        let log = forward_log.clone();
        let label = label.clone();
        let data = data.clone();
        async move {
            log.push(format!("forward-start:{label}"));
            tokio::time::sleep(delay).await;
            result.set_data(data);
            log.push(format!("forward:{label}"));
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActionResult;
    use serde_json::json;

    #[test]
    fn test_event_log_queries() {
        let log = EventLog::new();
        log.push("a:1");
        log.push("b:1");
        log.push("a:2");

        assert_eq!(log.with_prefix("a:"), vec!["a:1", "a:2"]);
        assert_eq!(log.count("b:1"), 1);
        assert_eq!(log.position("a:2"), Some(2));
        assert_eq!(log.position("zzz"), None);
    }

    #[tokio::test]
    async fn test_failing_operation_errors() {
        let log = EventLog::new();
        let op = failing_operation("bad", &log);
        let result = Arc::new(ActionResult::new(json!(null)));

        let err = op.forward(result).unwrap().await.unwrap_err();
        assert_eq!(err.to_string(), "bad failed");
        assert_eq!(log.entries(), vec!["forward:bad"]);
    }
}
