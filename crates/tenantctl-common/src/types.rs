//! Domain primitive types used across the tenantctl workspace.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// A registered tenant, owned by the registration subsystem.
///
/// The lifecycle core treats tenants as read-only reference data; the
/// `subdomain` doubles as the name of the tenant's container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Registration id.
    pub id: u64,
    /// Contact name.
    pub name: String,
    /// Organization name.
    pub company_name: String,
    /// Unique subdomain, also the container name.
    pub subdomain: String,
    /// Contact email.
    pub email: String,
    /// Login name, when the registration recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Registration timestamp (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Tenant {
    /// Returns the name of this tenant's container.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.subdomain
    }
}

/// State of a container as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeState {
    /// No container with this name exists.
    Absent,
    /// Container exists but has never been started.
    Created,
    /// Container process is running.
    Running,
    /// Container process has terminated.
    Exited,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// Canonical lifecycle status exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    /// Tenant registered, no container exists yet.
    NotCreated,
    /// Container exists but is not running.
    Created,
    /// Container is running.
    Running,
    /// Container has stopped.
    Exited,
    /// The engine could not be reached; the real state is unknown.
    DockerUnavailable,
}

impl ContainerStatus {
    /// Returns the actions that have a legal transition from this status.
    #[must_use]
    pub fn available_actions(self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| action.is_legal_from(self))
            .collect()
    }

    /// Returns whether this status counts as stopped in fleet statistics.
    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Exited | Self::Created)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCreated => write!(f, "not_created"),
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::DockerUnavailable => write!(f, "docker_unavailable"),
        }
    }
}

/// An operator-requested lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create the container (it is left in `created`, never auto-started).
    Create,
    /// Start a created or exited container.
    Start,
    /// Stop a running container.
    Stop,
    /// Remove the container entirely.
    Remove,
}

impl Action {
    /// Every action, in display order.
    pub const ALL: [Self; 4] = [Self::Create, Self::Start, Self::Stop, Self::Remove];

    /// Returns whether this action has a legal transition from `status`.
    ///
    /// Nothing is legal from `docker_unavailable`.
    #[must_use]
    pub const fn is_legal_from(self, status: ContainerStatus) -> bool {
        use ContainerStatus::{Created, Exited, NotCreated, Running};
        match self {
            Self::Create => matches!(status, NotCreated),
            Self::Start => matches!(status, Created | Exited),
            Self::Stop => matches!(status, Running),
            Self::Remove => matches!(status, Running | Created | Exited),
        }
    }

    /// Returns the status the container settles in once the action succeeds.
    #[must_use]
    pub const fn target(self) -> ContainerStatus {
        match self {
            Self::Create => ContainerStatus::Created,
            Self::Start => ContainerStatus::Running,
            Self::Stop => ContainerStatus::Exited,
            Self::Remove => ContainerStatus::NotCreated,
        }
    }

    /// Returns the lowercase wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "remove" | "rm" => Ok(Self::Remove),
            other => Err(ControlError::Config {
                message: format!("unknown action '{other}' (expected create, start, stop, or remove)"),
            }),
        }
    }
}

/// A host port forwarded to a port inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port opened on the host.
    pub host: u16,
    /// Port the application listens on inside the container.
    pub container: u16,
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// How tenant containers are published on the host.
///
/// Tenant `n` is reachable on host port `host_base + n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPublishing {
    /// Host port that tenant id 0 would receive.
    pub host_base: u16,
    /// Port the tenant application listens on inside its container.
    pub container_port: u16,
}

impl PortPublishing {
    /// Returns the binding for one tenant.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the host port would exceed 65535.
    pub fn binding_for(&self, tenant_id: u64) -> Result<PortBinding, ControlError> {
        let host = u64::from(self.host_base)
            .checked_add(tenant_id)
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| ControlError::Config {
                message: format!(
                    "tenant {tenant_id} has no host port: {} + {tenant_id} exceeds 65535",
                    self.host_base
                ),
            })?;
        Ok(PortBinding {
            host,
            container: self.container_port,
        })
    }
}

/// An in-flight action request. Lives only for the duration of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Correlation id for logs and responses.
    pub id: uuid::Uuid,
    /// Target container.
    pub container_name: String,
    /// Requested action.
    pub action: Action,
    /// When the request entered the dispatcher.
    pub requested_at: DateTime<Utc>,
    /// Port to publish when the action creates the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<PortBinding>,
}

impl ActionRequest {
    /// Creates a request stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(container_name: impl Into<String>, action: Action) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            container_name: container_name.into(),
            action,
            requested_at: Utc::now(),
            publish: None,
        }
    }

    /// Sets the port published by a `create`. Ignored by other actions.
    #[must_use]
    pub const fn with_publish(mut self, publish: Option<PortBinding>) -> Self {
        self.publish = publish;
        self
    }
}

/// Tenant details attached to a container record for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSummary {
    /// Registration id.
    pub id: u64,
    /// Contact name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Login name, if any.
    pub username: Option<String>,
    /// Organization name.
    pub company_name: String,
    /// Subdomain.
    pub subdomain: String,
    /// Registration timestamp.
    pub created_at: Option<String>,
}

impl From<&Tenant> for TenantSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            email: tenant.email.clone(),
            username: tenant.username.clone(),
            company_name: tenant.company_name.clone(),
            subdomain: tenant.subdomain.clone(),
            created_at: tenant.created_at.clone(),
        }
    }
}

/// Resolved lifecycle view of one tenant's container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Short runtime id, when the container exists.
    pub id: Option<String>,
    /// Container name.
    pub name: String,
    /// Owning tenant.
    pub user_info: Option<TenantSummary>,
    /// Image reference.
    pub image: String,
    /// Resolved status.
    pub status: ContainerStatus,
    /// Opaque port descriptor reported by the engine.
    pub ports: String,
    /// Creation timestamp reported by the engine.
    pub created: Option<String>,
    /// Whether the engine answered the query this record came from.
    pub docker_available: bool,
    /// Actions with a legal transition from `status`.
    pub actions: Vec<Action>,
}

/// Fleet-wide counters folded from one snapshot of resolved records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    /// Registered tenants.
    pub total_users: usize,
    /// Container records considered.
    pub total_containers: usize,
    /// Records in `running`.
    pub running_containers: usize,
    /// Records in `exited` or `created`.
    pub stopped_containers: usize,
}
