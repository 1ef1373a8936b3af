//! In-process runtime adapter.
//!
//! Holds container state in memory while following the same engine rules
//! as the Docker adapter: names are unique, operations on a missing
//! container fail, and an unreachable engine rejects every call. Used for
//! the server's demo mode and throughout the test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tenantctl_common::constants::SHORT_ID_LENGTH;
use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::{PortBinding, RuntimeState};

use super::{ContainerObservation, ContainerRuntime, CreateSpec, Snapshot};

/// Port descriptor reported for running containers that publish nothing.
const MEMORY_PORTS: &str = "80/tcp";

/// Adapter operations, recorded for inspection by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOp {
    /// Single-container observation.
    Inspect,
    /// Full listing.
    Snapshot,
    /// Container creation.
    Create,
    /// Container start.
    Start,
    /// Container stop.
    Stop,
    /// Container removal.
    Remove,
}

impl RuntimeOp {
    /// Returns whether this operation changes engine state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Inspect | Self::Snapshot)
    }
}

#[derive(Debug, Clone)]
struct MemoryContainer {
    id: String,
    image: String,
    state: RuntimeState,
    created: String,
    publish: Option<PortBinding>,
}

/// Container engine simulated in memory.
#[derive(Debug)]
pub struct MemoryRuntime {
    containers: Mutex<HashMap<String, MemoryContainer>>,
    reachable: AtomicBool,
    injected_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<(RuntimeOp, String)>>,
}

impl MemoryRuntime {
    /// Creates an empty, reachable engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            injected_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Seeds a container in the given state. `Absent` removes it.
    #[must_use]
    pub fn with_container(self, name: &str, image: &str, state: RuntimeState) -> Self {
        self.seed(name, image, state);
        self
    }

    /// Places a container directly in the given state, bypassing the engine rules.
    pub fn seed(&self, name: &str, image: &str, state: RuntimeState) {
        let mut containers = guard(&self.containers);
        if state == RuntimeState::Absent {
            let _ = containers.remove(name);
            return;
        }
        let _ = containers.insert(name.to_string(), MemoryContainer::new(image, state, None));
    }

    /// Makes every subsequent call succeed or fail as unreachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes the next mutating call fail with the given detail.
    pub fn fail_next(&self, detail: impl Into<String>) {
        *guard(&self.injected_failure) = Some(detail.into());
    }

    /// Returns the engine-side state of a container.
    pub fn state_of(&self, name: &str) -> RuntimeState {
        guard(&self.containers)
            .get(name)
            .map_or(RuntimeState::Absent, |c| c.state)
    }

    /// Returns how many times `op` was invoked, for any container.
    pub fn calls(&self, op: RuntimeOp) -> usize {
        guard(&self.calls).iter().filter(|(o, _)| *o == op).count()
    }

    /// Returns how many state-changing calls reached the engine.
    pub fn mutating_calls(&self) -> usize {
        guard(&self.calls)
            .iter()
            .filter(|(op, _)| op.is_mutating())
            .count()
    }

    fn record(&self, op: RuntimeOp, name: &str) -> Result<()> {
        guard(&self.calls).push((op, name.to_string()));
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(ControlError::RuntimeUnavailable {
                reason: "memory engine is offline".into(),
            });
        }
        if op.is_mutating() {
            if let Some(detail) = guard(&self.injected_failure).take() {
                return Err(ControlError::ActionFailed { detail });
            }
        }
        Ok(())
    }

    /// Applies a state transition to an existing container.
    fn transition(&self, name: &str, apply: impl FnOnce(&mut MemoryContainer)) -> Result<()> {
        let mut containers = guard(&self.containers);
        let container = containers.get_mut(name).ok_or_else(|| no_such_container(name))?;
        apply(container);
        Ok(())
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MemoryRuntime {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn inspect(&self, name: &str) -> Result<ContainerObservation> {
        self.record(RuntimeOp::Inspect, name)?;
        Ok(guard(&self.containers)
            .get(name)
            .map_or_else(|| ContainerObservation::absent(name), |c| c.observe(name)))
    }

    fn snapshot(&self) -> Result<Snapshot> {
        self.record(RuntimeOp::Snapshot, "*")?;
        Ok(guard(&self.containers)
            .iter()
            .map(|(name, c)| (name.clone(), c.observe(name)))
            .collect())
    }

    fn create(&self, name: &str, spec: &CreateSpec) -> Result<()> {
        self.record(RuntimeOp::Create, name)?;
        let mut containers = guard(&self.containers);
        if containers.contains_key(name) {
            return Err(ControlError::ActionFailed {
                detail: format!("Conflict. The container name \"/{name}\" is already in use"),
            });
        }
        let _ = containers.insert(
            name.to_string(),
            MemoryContainer::new(&spec.image, RuntimeState::Created, spec.publish),
        );
        tracing::info!(
            name,
            image = %spec.image,
            publish = ?spec.publish,
            "container created (memory)"
        );
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::Start, name)?;
        self.transition(name, |c| c.state = RuntimeState::Running)?;
        tracing::info!(name, "container started (memory)");
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::Stop, name)?;
        self.transition(name, |c| {
            if c.state == RuntimeState::Running {
                c.state = RuntimeState::Exited;
            }
        })?;
        tracing::info!(name, "container stopped (memory)");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.record(RuntimeOp::Remove, name)?;
        let _removed = guard(&self.containers)
            .remove(name)
            .ok_or_else(|| no_such_container(name))?;
        tracing::info!(name, "container removed (memory)");
        Ok(())
    }
}

impl MemoryContainer {
    fn new(image: &str, state: RuntimeState, publish: Option<PortBinding>) -> Self {
        let id: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SHORT_ID_LENGTH)
            .collect();
        Self {
            id,
            image: image.to_string(),
            state,
            created: chrono::Utc::now().to_rfc3339(),
            publish,
        }
    }

    fn observe(&self, name: &str) -> ContainerObservation {
        ContainerObservation {
            name: name.to_string(),
            state: self.state,
            id: Some(self.id.clone()),
            image: Some(self.image.clone()),
            ports: Some(self.ports()),
            created: Some(self.created.clone()),
        }
    }

    /// Port descriptor in the engine's `ps` format.
    fn ports(&self) -> String {
        if self.state != RuntimeState::Running {
            return String::new();
        }
        self.publish.map_or_else(
            || MEMORY_PORTS.to_string(),
            |b| format!("0.0.0.0:{}->{}/tcp", b.host, b.container),
        )
    }
}

fn no_such_container(name: &str) -> ControlError {
    ControlError::ActionFailed {
        detail: format!("Error response from daemon: No such container: {name}"),
    }
}

/// Locks a mutex, recovering the data if a panicking holder poisoned it.
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle_follows_engine_rules() {
        let rt = MemoryRuntime::new();
        rt.create("acme", &CreateSpec::new("nginx:alpine")).unwrap();
        assert_eq!(rt.state_of("acme"), RuntimeState::Created);
        rt.start("acme").unwrap();
        assert_eq!(rt.state_of("acme"), RuntimeState::Running);
        rt.stop("acme").unwrap();
        assert_eq!(rt.state_of("acme"), RuntimeState::Exited);
        rt.remove("acme").unwrap();
        assert_eq!(rt.state_of("acme"), RuntimeState::Absent);
    }

    #[test]
    fn duplicate_create_fails() {
        let rt = MemoryRuntime::new().with_container("acme", "nginx:alpine", RuntimeState::Exited);
        let err = rt.create("acme", &CreateSpec::new("nginx:alpine")).unwrap_err();
        assert!(matches!(err, ControlError::ActionFailed { .. }));
    }

    #[test]
    fn missing_container_is_absent_not_an_error() {
        let rt = MemoryRuntime::new();
        let obs = rt.inspect("ghost").unwrap();
        assert_eq!(obs.state, RuntimeState::Absent);
        assert!(rt.start("ghost").is_err());
    }

    #[test]
    fn offline_engine_rejects_every_call() {
        let rt = MemoryRuntime::new();
        rt.set_reachable(false);
        assert!(matches!(
            rt.inspect("acme"),
            Err(ControlError::RuntimeUnavailable { .. })
        ));
        assert!(matches!(
            rt.snapshot(),
            Err(ControlError::RuntimeUnavailable { .. })
        ));
    }

    #[test]
    fn injected_failure_applies_once() {
        let rt = MemoryRuntime::new().with_container("acme", "nginx:alpine", RuntimeState::Created);
        rt.fail_next("disk full");
        let err = rt.start("acme").unwrap_err();
        assert_eq!(err.to_string(), "action failed: disk full");
        rt.start("acme").unwrap();
        assert_eq!(rt.state_of("acme"), RuntimeState::Running);
    }

    #[test]
    fn call_log_separates_reads_from_writes() {
        let rt = MemoryRuntime::new();
        let _ = rt.inspect("acme").unwrap();
        let _ = rt.snapshot().unwrap();
        rt.create("acme", &CreateSpec::new("nginx:alpine")).unwrap();
        assert_eq!(rt.calls(RuntimeOp::Inspect), 1);
        assert_eq!(rt.calls(RuntimeOp::Create), 1);
        assert_eq!(rt.mutating_calls(), 1);
    }

    #[test]
    fn published_port_shows_once_running() {
        let rt = MemoryRuntime::new();
        let spec = CreateSpec::new("nginx:alpine").with_publish(Some(PortBinding {
            host: 8081,
            container: 80,
        }));
        rt.create("acme", &spec).unwrap();
        assert_eq!(rt.inspect("acme").unwrap().ports.as_deref(), Some(""));
        rt.start("acme").unwrap();
        assert_eq!(
            rt.inspect("acme").unwrap().ports.as_deref(),
            Some("0.0.0.0:8081->80/tcp")
        );
    }

    #[test]
    fn running_containers_report_ports() {
        let rt = MemoryRuntime::new().with_container("acme", "nginx:alpine", RuntimeState::Running);
        let snapshot = rt.snapshot().unwrap();
        assert_eq!(snapshot["acme"].ports.as_deref(), Some(MEMORY_PORTS));
    }
}
