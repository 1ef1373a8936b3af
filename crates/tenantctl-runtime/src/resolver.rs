//! Status resolution.
//!
//! Turns what the runtime adapter reports into the canonical status shown
//! to operators. Resolution is a pure function of the observation it is
//! handed: nothing is remembered between calls, so a flapping engine shows
//! up immediately on the next read.

use tenantctl_common::constants::NOT_AVAILABLE;
use tenantctl_common::error::ControlError;
use tenantctl_common::types::{ContainerRecord, ContainerStatus, RuntimeState, Tenant, TenantSummary};

use crate::backend::{ContainerObservation, ContainerRuntime, Snapshot};

/// One point-in-time view of the engine.
#[derive(Debug, Clone)]
pub enum RuntimeView {
    /// The engine could not be reached.
    Unavailable {
        /// Why the engine is considered unreachable.
        reason: String,
    },
    /// Every container the engine reported.
    Snapshot(Snapshot),
}

impl RuntimeView {
    /// Takes one snapshot of the engine.
    ///
    /// Any failure to list containers means nothing can be observed, so it
    /// yields [`RuntimeView::Unavailable`].
    pub fn observe(runtime: &dyn ContainerRuntime) -> Self {
        match runtime.snapshot() {
            Ok(snapshot) => Self::Snapshot(snapshot),
            Err(e) => {
                tracing::warn!(runtime = runtime.name(), error = %e, "container engine unavailable");
                let reason = match e {
                    ControlError::RuntimeUnavailable { reason } => reason,
                    other => other.to_string(),
                };
                Self::Unavailable { reason }
            }
        }
    }

    /// Returns whether the engine answered.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    /// Returns the resolved status of the named container.
    #[must_use]
    pub fn status_of(&self, name: &str) -> ContainerStatus {
        match self {
            Self::Unavailable { .. } => ContainerStatus::DockerUnavailable,
            Self::Snapshot(snapshot) => snapshot
                .get(name)
                .map_or(ContainerStatus::NotCreated, |obs| status_for(obs.state)),
        }
    }
}

/// Maps an engine state onto the operator-facing status.
#[must_use]
pub const fn status_for(state: RuntimeState) -> ContainerStatus {
    match state {
        RuntimeState::Absent => ContainerStatus::NotCreated,
        RuntimeState::Created => ContainerStatus::Created,
        RuntimeState::Running => ContainerStatus::Running,
        RuntimeState::Exited => ContainerStatus::Exited,
    }
}

/// Builds [`ContainerRecord`]s from runtime observations.
#[derive(Debug, Clone)]
pub struct Resolver {
    default_image: String,
}

impl Resolver {
    /// Creates a resolver that reports `default_image` when the engine names none.
    #[must_use]
    pub fn new(default_image: impl Into<String>) -> Self {
        Self {
            default_image: default_image.into(),
        }
    }

    /// Resolves one tenant's container against a view.
    #[must_use]
    pub fn resolve(&self, tenant: &Tenant, view: &RuntimeView) -> ContainerRecord {
        let name = tenant.container_name();
        match view {
            RuntimeView::Unavailable { .. } => self.record(name, Some(tenant), None),
            RuntimeView::Snapshot(snapshot) => {
                let absent = ContainerObservation::absent(name);
                let observation = snapshot.get(name).unwrap_or(&absent);
                self.record(name, Some(tenant), Some(observation))
            }
        }
    }

    /// Resolves every tenant against the same view.
    #[must_use]
    pub fn resolve_all(&self, tenants: &[Tenant], view: &RuntimeView) -> Vec<ContainerRecord> {
        tenants.iter().map(|t| self.resolve(t, view)).collect()
    }

    /// Resolves a single tenant with a fresh `inspect` call.
    pub fn resolve_live(&self, tenant: &Tenant, runtime: &dyn ContainerRuntime) -> ContainerRecord {
        let name = tenant.container_name();
        match runtime.inspect(name) {
            Ok(observation) => self.record(name, Some(tenant), Some(&observation)),
            Err(e) => {
                tracing::warn!(container = name, error = %e, "inspect failed");
                self.record(name, Some(tenant), None)
            }
        }
    }

    /// Builds a record; `None` means the engine was unreachable.
    fn record(
        &self,
        name: &str,
        tenant: Option<&Tenant>,
        observation: Option<&ContainerObservation>,
    ) -> ContainerRecord {
        let status = observation.map_or(ContainerStatus::DockerUnavailable, |o| status_for(o.state));
        let present = observation.filter(|o| o.state != RuntimeState::Absent);

        ContainerRecord {
            id: present.and_then(|o| o.id.clone()),
            name: name.to_string(),
            user_info: tenant.map(TenantSummary::from),
            image: present
                .and_then(|o| o.image.clone())
                .unwrap_or_else(|| self.default_image.clone()),
            status,
            ports: present
                .and_then(|o| o.ports.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            created: present.and_then(|o| o.created.clone()),
            docker_available: observation.is_some(),
            actions: status.available_actions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantctl_common::types::Action;

    use crate::backend::memory::MemoryRuntime;

    fn tenant(subdomain: &str) -> Tenant {
        Tenant {
            id: 1,
            name: "Ann".into(),
            company_name: "Acme".into(),
            subdomain: subdomain.into(),
            email: "ann@acme.io".into(),
            username: None,
            created_at: None,
        }
    }

    #[test]
    fn observation_table_maps_each_state() {
        assert_eq!(status_for(RuntimeState::Absent), ContainerStatus::NotCreated);
        assert_eq!(status_for(RuntimeState::Created), ContainerStatus::Created);
        assert_eq!(status_for(RuntimeState::Running), ContainerStatus::Running);
        assert_eq!(status_for(RuntimeState::Exited), ContainerStatus::Exited);
    }

    #[test]
    fn unreachable_engine_resolves_to_docker_unavailable() {
        let view = RuntimeView::Unavailable {
            reason: "down".into(),
        };
        let record = Resolver::new("nginx:alpine").resolve(&tenant("acme"), &view);
        assert_eq!(record.status, ContainerStatus::DockerUnavailable);
        assert!(!record.docker_available);
        assert!(record.actions.is_empty());
        assert_eq!(record.image, "nginx:alpine");
    }

    #[test]
    fn missing_container_resolves_to_not_created() {
        let view = RuntimeView::Snapshot(Snapshot::new());
        let record = Resolver::new("nginx:alpine").resolve(&tenant("acme"), &view);
        assert_eq!(record.status, ContainerStatus::NotCreated);
        assert!(record.docker_available);
        assert_eq!(record.actions, vec![Action::Create]);
        assert_eq!(record.ports, NOT_AVAILABLE);
        assert!(record.id.is_none());
    }

    #[test]
    fn repeated_observation_is_stable() {
        let rt = MemoryRuntime::new().with_container("acme", "nginx:1.27", RuntimeState::Running);
        let resolver = Resolver::new("nginx:alpine");
        let first = resolver.resolve(&tenant("acme"), &RuntimeView::observe(&rt));
        let second = resolver.resolve(&tenant("acme"), &RuntimeView::observe(&rt));
        assert_eq!(first, second);
        assert_eq!(first.image, "nginx:1.27");
        assert_eq!(first.status, ContainerStatus::Running);
    }

    #[test]
    fn flapping_engine_is_reflected_immediately() {
        let rt = MemoryRuntime::new().with_container("acme", "nginx:alpine", RuntimeState::Running);
        assert_eq!(RuntimeView::observe(&rt).status_of("acme"), ContainerStatus::Running);
        rt.set_reachable(false);
        assert_eq!(
            RuntimeView::observe(&rt).status_of("acme"),
            ContainerStatus::DockerUnavailable
        );
        rt.set_reachable(true);
        assert_eq!(RuntimeView::observe(&rt).status_of("acme"), ContainerStatus::Running);
    }

    #[test]
    fn live_resolution_falls_back_when_unreachable() {
        let rt = MemoryRuntime::new();
        rt.set_reachable(false);
        let record = Resolver::new("nginx:alpine").resolve_live(&tenant("acme"), &rt);
        assert_eq!(record.status, ContainerStatus::DockerUnavailable);
        assert_eq!(record.user_info.map(|u| u.subdomain), Some("acme".to_string()));
    }
}
