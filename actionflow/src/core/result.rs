//! The shared result carrier for a single run.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutable outcome of one run, shared by every operation of that run.
///
/// The payload is the invocation argument and is never modified. `data` starts
/// out as `Null` and is filled in by operations (and possibly rewritten by
/// compensating actions during rollback).
#[derive(Debug)]
pub struct ActionResult {
    run_id: Uuid,
    payload: serde_json::Value,
    data: RwLock<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl ActionResult {
    /// Creates a result for the given invocation payload.
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self::for_run(Uuid::now_v7(), payload)
    }

    /// Creates a result bound to a specific run.
    #[must_use]
    pub fn for_run(run_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            run_id,
            payload,
            data: RwLock::new(serde_json::Value::Null),
            created_at: Utc::now(),
        }
    }

    /// Returns the id of the run that produced this result.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the invocation payload.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Returns a copy of the current data.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        self.data.read().clone()
    }

    /// Returns true once any operation has written data.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.data.read().is_null()
    }

    /// Replaces the data.
    pub fn set_data(&self, data: impl Into<serde_json::Value>) {
        *self.data.write() = data.into();
    }

    /// Edits the data in place.
    pub fn update_data<F>(&self, update: F)
    where
        F: FnOnce(&mut serde_json::Value),
    {
        update(&mut self.data.write());
    }

    /// Clears the data back to `Null`.
    pub fn clear_data(&self) {
        *self.data.write() = serde_json::Value::Null;
    }

    /// Returns when the result was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Takes a serializable snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ResultSnapshot {
        ResultSnapshot {
            run_id: self.run_id,
            payload: self.payload.clone(),
            data: self.data(),
            created_at: self.created_at,
        }
    }
}

/// A point-in-time copy of an [`ActionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    /// The run id.
    pub run_id: Uuid,
    /// The invocation payload.
    pub payload: serde_json::Value,
    /// The data at snapshot time.
    pub data: serde_json::Value,
    /// When the result was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_new_result_has_no_data() {
        let result = ActionResult::new(json!({"id": 7}));

        assert_eq!(result.payload(), &json!({"id": 7}));
        assert!(!result.has_data());
        assert_eq!(result.data(), serde_json::Value::Null);
    }

    #[test]
    fn test_update_data_in_place() {
        let result = ActionResult::new(serde_json::Value::Null);
        result.set_data(json!({"items": []}));
        result.update_data(|data| {
            if let Some(items) = data.get_mut("items").and_then(|v| v.as_array_mut()) {
                items.push(json!("a"));
            }
        });

        assert_eq!(result.data(), json!({"items": ["a"]}));

        result.clear_data();
        assert!(!result.has_data());
    }

    #[test]
    fn test_snapshot_serializes() {
        let run_id = Uuid::now_v7();
        let result = ActionResult::for_run(run_id, json!("arg"));
        result.set_data("x");

        let snapshot = result.snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["run_id"], json!(run_id.to_string()));
        assert_eq!(value["data"], json!("x"));
        assert_eq!(value["payload"], json!("arg"));
    }
}
