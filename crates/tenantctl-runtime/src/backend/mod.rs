//! Container runtime abstraction.
//!
//! The adapter is the only component that touches real infrastructure and
//! the only source of truth for a container's state. Implementors must
//! report an unreachable engine as
//! [`ControlError::RuntimeUnavailable`](tenantctl_common::error::ControlError::RuntimeUnavailable)
//! and a missing container as a normal [`RuntimeState::Absent`] observation.

pub mod docker;
pub mod memory;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tenantctl_common::config::ControlConfig;
use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::{PortBinding, RuntimeState};

/// What the engine reported about a single container name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerObservation {
    /// Container name.
    pub name: String,
    /// Engine-side state.
    pub state: RuntimeState,
    /// Short engine id, when the container exists.
    pub id: Option<String>,
    /// Image the container was created from.
    pub image: Option<String>,
    /// Opaque port descriptor.
    pub ports: Option<String>,
    /// Engine creation timestamp.
    pub created: Option<String>,
}

impl ContainerObservation {
    /// Observation for a name the engine does not know.
    #[must_use]
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RuntimeState::Absent,
            id: None,
            image: None,
            ports: None,
            created: None,
        }
    }
}

/// What a new container is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpec {
    /// Image to create the container from.
    pub image: String,
    /// Host port forwarded into the container, if any.
    pub publish: Option<PortBinding>,
}

impl CreateSpec {
    /// A spec for `image` with nothing published.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            publish: None,
        }
    }

    /// Publishes `binding` on the host.
    #[must_use]
    pub const fn with_publish(mut self, binding: Option<PortBinding>) -> Self {
        self.publish = binding;
        self
    }
}

/// Every container the engine knows about, keyed by name.
pub type Snapshot = HashMap<String, ContainerObservation>;

/// Boundary to the container engine.
///
/// Calls may block on process or network I/O. The engine enforces its own
/// rules (for example, starting a missing container fails) and those
/// failures surface as `ActionFailed`.
pub trait ContainerRuntime: Send + Sync {
    /// Short name of this backend for logs.
    fn name(&self) -> &'static str;

    /// Observes a single container.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` if the engine cannot be reached.
    fn inspect(&self, name: &str) -> Result<ContainerObservation>;

    /// Observes every container in one engine call.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` if the engine cannot be reached.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Creates a container without starting it.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` or `ActionFailed`.
    fn create(&self, name: &str, spec: &CreateSpec) -> Result<()>;

    /// Starts a created or exited container.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` or `ActionFailed`.
    fn start(&self, name: &str) -> Result<()>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` or `ActionFailed`.
    fn stop(&self, name: &str) -> Result<()>;

    /// Removes a container in any state.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeUnavailable` or `ActionFailed`.
    fn remove(&self, name: &str) -> Result<()>;
}

/// Selects which engine backs the control server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// The `docker` CLI.
    Docker,
    /// An in-process engine holding state in memory.
    Memory,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for RuntimeKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(Self::Docker),
            "memory" => Ok(Self::Memory),
            other => Err(ControlError::Config {
                message: format!("unknown runtime '{other}' (expected docker or memory)"),
            }),
        }
    }
}

/// Builds the runtime adapter selected by `kind`.
#[must_use]
pub fn build_runtime(kind: RuntimeKind, config: &ControlConfig) -> Arc<dyn ContainerRuntime> {
    tracing::info!(runtime = %kind, "initializing container runtime");
    match kind {
        RuntimeKind::Docker => {
            let timeout = Duration::from_secs(config.runtime_timeout_secs);
            let runtime = config.docker_binary.clone().map_or_else(
                || docker::DockerRuntime::new(timeout),
                |binary| docker::DockerRuntime::with_binary(binary, timeout),
            );
            Arc::new(runtime)
        }
        RuntimeKind::Memory => Arc::new(memory::MemoryRuntime::new()),
    }
}
