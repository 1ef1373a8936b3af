//! Per-container action lock.
//!
//! A process-wide map from container name to the action currently in
//! flight. The mutex guards only the map: it is held for the check-and-set
//! and for the release, never while the runtime adapter is working.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::Action;

/// At most one in-flight action per container name.
#[derive(Debug, Default)]
pub struct ActionLock {
    in_flight: Mutex<HashMap<String, Action>>,
}

impl ActionLock {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `container` for `action`.
    ///
    /// The claim lasts until the returned guard is dropped, on every exit
    /// path including unwinding.
    ///
    /// # Errors
    ///
    /// Returns `ActionInProgress` if the container is already claimed. The
    /// request is rejected, not queued.
    pub fn try_acquire(&self, container: &str, action: Action) -> Result<ActionGuard<'_>> {
        let mut entries = self.entries();
        match entries.entry(container.to_string()) {
            Entry::Occupied(held) => Err(ControlError::ActionInProgress {
                container: container.to_string(),
                in_flight: held.get().to_string(),
            }),
            Entry::Vacant(slot) => {
                let _ = slot.insert(action);
                tracing::debug!(container, %action, "action lock acquired");
                Ok(ActionGuard {
                    lock: self,
                    container: container.to_string(),
                    action,
                })
            }
        }
    }

    /// Returns the action currently holding `container`, if any.
    pub fn in_flight(&self, container: &str) -> Option<Action> {
        self.entries().get(container).copied()
    }

    /// Returns how many containers are currently claimed.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns whether no container is claimed.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// A panic elsewhere must never leave containers permanently locked, so
    /// poisoning is ignored.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Action>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped claim on one container. Releases the claim when dropped.
#[derive(Debug)]
pub struct ActionGuard<'a> {
    lock: &'a ActionLock,
    container: String,
    action: Action,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.entries().remove(&self.container);
        tracing::debug!(container = %self.container, action = %self.action, "action lock released");
    }
}
