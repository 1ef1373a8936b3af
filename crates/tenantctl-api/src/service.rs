//! The control service: what each API call does, independent of transport.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::{
    Action, ActionRequest, ContainerRecord, ContainerStatus, FleetStats, PortPublishing,
};
use tenantctl_runtime::backend::ContainerRuntime;
use tenantctl_runtime::dispatcher::Dispatcher;
use tenantctl_runtime::fleet;
use tenantctl_runtime::resolver::{Resolver, RuntimeView};

use crate::auth::{Operator, TokenVerifier, bearer_token};
use crate::tenants::TenantStore;

/// Liveness report. Needs no credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Always `"healthy"` when the server answers.
    pub status: String,
    /// Name of the runtime adapter in use.
    pub runtime: String,
    /// Whether the engine answered a snapshot query just now.
    pub docker_available: bool,
    /// Server version.
    pub version: String,
}

/// Result of a successful action invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Always `true`; failures are returned as errors.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Correlation id of the dispatched request.
    pub request_id: uuid::Uuid,
    /// Status observed before the action ran.
    pub previous: ContainerStatus,
    /// Freshly resolved record for the container.
    pub container: ContainerRecord,
}

/// Operator control surface over the lifecycle core.
pub struct ControlService {
    tenants: Arc<dyn TenantStore>,
    dispatcher: Dispatcher,
    resolver: Resolver,
    verifier: Arc<dyn TokenVerifier>,
    publishing: Option<PortPublishing>,
}

impl std::fmt::Debug for ControlService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlService")
            .field("dispatcher", &self.dispatcher)
            .field("resolver", &self.resolver)
            .field("publishing", &self.publishing)
            .finish_non_exhaustive()
    }
}

impl ControlService {
    /// Wires a service over the given collaborators.
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        runtime: Arc<dyn ContainerRuntime>,
        verifier: Arc<dyn TokenVerifier>,
        default_image: &str,
    ) -> Self {
        Self {
            tenants,
            dispatcher: Dispatcher::new(runtime, default_image),
            resolver: Resolver::new(default_image),
            verifier,
            publishing: None,
        }
    }

    /// Publishes each created container on its tenant's host port.
    #[must_use]
    pub const fn with_port_publishing(mut self, publishing: Option<PortPublishing>) -> Self {
        self.publishing = publishing;
        self
    }

    /// Returns the dispatcher, for observing in-flight actions.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Verifies the presented credential.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the credential is missing or rejected.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<Operator> {
        let token = credential
            .and_then(bearer_token)
            .ok_or_else(|| ControlError::Unauthorized {
                message: "missing bearer token".into(),
            })?;
        self.verifier.verify(token).inspect_err(|e| {
            tracing::warn!(error = %e, "credential rejected");
        })
    }

    /// Reports liveness and engine reachability.
    pub fn health(&self) -> Health {
        let runtime = self.dispatcher.runtime();
        Health {
            status: "healthy".into(),
            runtime: runtime.name().to_string(),
            docker_available: RuntimeView::observe(runtime.as_ref()).is_available(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Lists one record per registered tenant, resolved from a single
    /// engine snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tenant source cannot be read; an
    /// unreachable engine yields `docker_unavailable` records instead.
    pub fn list_containers(&self, operator: &Operator) -> Result<Vec<ContainerRecord>> {
        let tenants = self.tenants.tenants()?;
        let view = RuntimeView::observe(self.dispatcher.runtime().as_ref());
        tracing::debug!(
            operator = %operator.subject,
            tenants = tenants.len(),
            available = view.is_available(),
            "listing containers"
        );
        Ok(self.resolver.resolve_all(&tenants, &view))
    }

    /// Computes fleet counters from a single engine snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tenant source cannot be read.
    pub fn fleet_stats(&self, operator: &Operator) -> Result<FleetStats> {
        let tenants = self.tenants.tenants()?;
        let view = RuntimeView::observe(self.dispatcher.runtime().as_ref());
        let records = self.resolver.resolve_all(&tenants, &view);
        let stats = fleet::aggregate(tenants.len(), &records);
        tracing::debug!(operator = %operator.subject, ?stats, "fleet stats");
        Ok(stats)
    }

    /// Runs `action` against `container` and returns its fresh record.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no tenant owns `container`; nothing is locked.
    /// - `Config` if a `create` cannot be given a host port.
    /// - Any dispatch error (`ActionInProgress`, `RuntimeUnavailable`,
    ///   `InvalidTransition`, `ActionFailed`).
    pub fn invoke(
        &self,
        operator: &Operator,
        container: &str,
        action: Action,
    ) -> Result<ActionResponse> {
        let tenant = self
            .tenants
            .find(container)?
            .ok_or_else(|| ControlError::NotFound {
                kind: "container",
                id: container.to_string(),
            })?;

        let publish = match (action, self.publishing) {
            (Action::Create, Some(publishing)) => Some(publishing.binding_for(tenant.id)?),
            _ => None,
        };

        tracing::info!(operator = %operator.subject, container, %action, ?publish, "action requested");
        let request = ActionRequest::new(container, action).with_publish(publish);
        let outcome = self.dispatcher.dispatch_request(request)?;
        let record = self
            .resolver
            .resolve_live(&tenant, self.dispatcher.runtime().as_ref());

        Ok(ActionResponse {
            success: true,
            message: format!("Container {container} {}", past_tense(action)),
            request_id: outcome.request.id,
            previous: outcome.previous,
            container: record,
        })
    }
}

const fn past_tense(action: Action) -> &'static str {
    match action {
        Action::Create => "created",
        Action::Start => "started",
        Action::Stop => "stopped",
        Action::Remove => "removed",
    }
}

#[cfg(test)]
mod tests {
    use tenantctl_common::types::{RuntimeState, Tenant};
    use tenantctl_runtime::backend::memory::{MemoryRuntime, RuntimeOp};

    use super::*;
    use crate::auth::JwtAuthority;
    use crate::tenants::MemoryTenantStore;

    const IMAGE: &str = "nginx:alpine";

    fn tenant(id: u64, subdomain: &str) -> Tenant {
        Tenant {
            id,
            name: "Ann".into(),
            company_name: "Acme".into(),
            subdomain: subdomain.into(),
            email: "ann@acme.io".into(),
            username: None,
            created_at: None,
        }
    }

    fn service(runtime: &Arc<MemoryRuntime>, tenants: Vec<Tenant>) -> (ControlService, Operator) {
        let authority = Arc::new(JwtAuthority::new("secret", 3600));
        let service = ControlService::new(
            Arc::new(MemoryTenantStore::new(tenants)),
            Arc::clone(runtime) as Arc<dyn ContainerRuntime>,
            authority.clone(),
            IMAGE,
        );
        let token = authority.issue("admin").unwrap();
        let operator = service.authenticate(Some(&token)).unwrap();
        (service, operator)
    }

    #[test]
    fn missing_credential_is_unauthorized() {
        let rt = Arc::new(MemoryRuntime::new());
        let (svc, _) = service(&rt, vec![]);
        let err = svc.authenticate(None).unwrap_err();
        assert_eq!(err.code(), 401);
        assert!(svc.authenticate(Some("Bearer nope")).is_err());
    }

    #[test]
    fn unknown_container_is_not_found_and_never_locked() {
        let rt = Arc::new(MemoryRuntime::new());
        let (svc, op) = service(&rt, vec![tenant(1, "acme")]);
        let err = svc.invoke(&op, "ghost", Action::Start).unwrap_err();
        assert!(matches!(err, ControlError::NotFound { .. }));
        assert_eq!(rt.calls(RuntimeOp::Inspect), 0);
        assert!(svc.dispatcher().lock().is_empty());
    }

    #[test]
    fn invoke_returns_fresh_record() {
        let rt = Arc::new(MemoryRuntime::new().with_container("acme", IMAGE, RuntimeState::Exited));
        let (svc, op) = service(&rt, vec![tenant(1, "acme")]);
        let response = svc.invoke(&op, "acme", Action::Start).unwrap();
        assert!(response.success);
        assert_eq!(response.message, "Container acme started");
        assert_eq!(response.previous, ContainerStatus::Exited);
        assert_eq!(response.container.status, ContainerStatus::Running);
        assert_eq!(response.container.actions, vec![Action::Stop, Action::Remove]);
    }

    #[test]
    fn created_container_is_published_on_tenant_port() {
        let rt = Arc::new(MemoryRuntime::new());
        let (svc, op) = service(&rt, vec![tenant(3, "acme")]);
        let svc = svc.with_port_publishing(Some(PortPublishing {
            host_base: 8080,
            container_port: 80,
        }));
        let _ = svc.invoke(&op, "acme", Action::Create).unwrap();
        let response = svc.invoke(&op, "acme", Action::Start).unwrap();
        assert_eq!(response.container.ports, "0.0.0.0:8083->80/tcp");
    }

    #[test]
    fn unpublishable_tenant_is_rejected_before_dispatch() {
        let rt = Arc::new(MemoryRuntime::new());
        let (svc, op) = service(&rt, vec![tenant(70_000, "acme")]);
        let svc = svc.with_port_publishing(Some(PortPublishing {
            host_base: 8080,
            container_port: 80,
        }));
        let err = svc.invoke(&op, "acme", Action::Create).unwrap_err();
        assert!(matches!(err, ControlError::Config { .. }));
        assert_eq!(rt.calls(RuntimeOp::Inspect), 0);
        assert!(svc.dispatcher().lock().is_empty());
    }

    #[test]
    fn listing_uses_one_snapshot() {
        let rt = Arc::new(MemoryRuntime::new().with_container("acme", IMAGE, RuntimeState::Running));
        let (svc, op) = service(&rt, vec![tenant(1, "acme"), tenant(2, "globex")]);
        let records = svc.list_containers(&op).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, ContainerStatus::Running);
        assert_eq!(records[1].status, ContainerStatus::NotCreated);
        assert_eq!(rt.calls(RuntimeOp::Snapshot), 1);
    }

    #[test]
    fn health_reports_unreachable_engine() {
        let rt = Arc::new(MemoryRuntime::new());
        rt.set_reachable(false);
        let (svc, _) = service(&rt, vec![]);
        let health = svc.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.runtime, "memory");
        assert!(!health.docker_available);
    }
}
