//! Tracks which hosts have a run in flight.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Identity of an invoking entity.
///
/// Ids are generated, never derived from the host's state, so two hosts that
/// look identical are still distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(Uuid);

impl HostId {
    /// Generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HostId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct FlightEntry {
    active: bool,
    run_id: Uuid,
}

/// Admits at most one active run per host.
///
/// Each check-and-set touches a single map entry; the shard lock is released
/// before the caller continues, so no lock is ever held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SingleFlightGuard {
    entries: Arc<DashMap<HostId, FlightEntry>>,
}

impl SingleFlightGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to admit a run for `key`.
    ///
    /// Returns `None` if a run for `key` is already active. The returned
    /// permit releases the entry when dropped.
    #[must_use]
    pub fn try_begin(&self, key: HostId, run_id: Uuid) -> Option<FlightPermit> {
        let admitted = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().active {
                    false
                } else {
                    occupied.insert(FlightEntry { active: true, run_id });
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(FlightEntry { active: true, run_id });
                true
            }
        };

        if admitted {
            debug!(host = %key, run_id = %run_id, "Run admitted");
            Some(FlightPermit {
                entries: Arc::clone(&self.entries),
                key,
                run_id,
            })
        } else {
            debug!(host = %key, "Run rejected: already in flight");
            None
        }
    }

    /// Removes the entry for `key` unconditionally.
    pub fn end(&self, key: HostId) {
        self.entries.remove(&key);
    }

    /// Returns true if a run for `key` is active.
    #[must_use]
    pub fn is_active(&self, key: HostId) -> bool {
        self.entries.get(&key).is_some_and(|entry| entry.active)
    }

    /// Returns the number of active runs.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.active).count()
    }
}

/// Proof of admission. Dropping it ends the run's registration.
#[derive(Debug)]
pub struct FlightPermit {
    entries: Arc<DashMap<HostId, FlightEntry>>,
    key: HostId,
    run_id: Uuid,
}

impl FlightPermit {
    /// Returns the admitted host.
    #[must_use]
    pub const fn key(&self) -> HostId {
        self.key
    }

    /// Returns the admitted run id.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        // A permit only clears its own run; an entry re-admitted after an
        // explicit `end` belongs to someone else.
        let run_id = self.run_id;
        self.entries.remove_if(&self.key, |_, entry| entry.run_id == run_id);
        debug!(host = %self.key, run_id = %run_id, "Run released");
    }
}
