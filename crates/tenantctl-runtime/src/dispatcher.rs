//! Action dispatch.
//!
//! Maps an operator-requested action onto a runtime adapter call while
//! guaranteeing at most one outstanding action per container. A request
//! for a container that is already busy is rejected immediately; the
//! adapter is never called for it.

use std::sync::Arc;

use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::{Action, ActionRequest, ContainerStatus};

use crate::backend::{ContainerRuntime, CreateSpec};
use crate::lock::ActionLock;
use crate::resolver::status_for;

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The request that was carried out.
    pub request: ActionRequest,
    /// Status observed right before the adapter call.
    pub previous: ContainerStatus,
    /// Status the container settles in after the action.
    pub target: ContainerStatus,
}

/// Dispatches lifecycle actions to the runtime adapter.
pub struct Dispatcher {
    runtime: Arc<dyn ContainerRuntime>,
    lock: ActionLock,
    image: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("runtime", &self.runtime.name())
            .field("lock", &self.lock)
            .field("image", &self.image)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher that creates containers from `image`.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, image: impl Into<String>) -> Self {
        Self {
            runtime,
            lock: ActionLock::new(),
            image: image.into(),
        }
    }

    /// Returns the lock table, for observing in-flight actions.
    #[must_use]
    pub const fn lock(&self) -> &ActionLock {
        &self.lock
    }

    /// Returns the runtime adapter this dispatcher drives.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Dispatches `action` against `container`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch_request`].
    pub fn dispatch(&self, container: &str, action: Action) -> Result<DispatchOutcome> {
        self.dispatch_request(ActionRequest::new(container, action))
    }

    /// Carries out one action request.
    ///
    /// The container is claimed before the adapter is touched and released
    /// before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - `ActionInProgress` if another action holds the container.
    /// - `RuntimeUnavailable` if the engine cannot be reached; no mutating
    ///   call is made.
    /// - `InvalidTransition` if the action is not legal from the observed status.
    /// - `ActionFailed` carrying the engine's detail if the call failed.
    pub fn dispatch_request(&self, request: ActionRequest) -> Result<DispatchOutcome> {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %request.id,
            container = %request.container_name,
            action = %request.action,
        );
        let _entered = span.enter();

        let guard = match self.lock.try_acquire(&request.container_name, request.action) {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!(error = %e, "dispatch rejected");
                return Err(e);
            }
        };
        let result = self.execute(&request);
        drop(guard);

        match result {
            Ok(previous) => {
                let target = request.action.target();
                tracing::info!(%previous, %target, "action completed");
                Ok(DispatchOutcome {
                    request,
                    previous,
                    target,
                })
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "action did not complete");
                Err(e)
            }
        }
    }

    /// Checks the transition against the engine's current view and runs the
    /// adapter call. Must only be called while the container is claimed.
    fn execute(&self, request: &ActionRequest) -> Result<ContainerStatus> {
        let name = request.container_name.as_str();
        let previous = self
            .runtime
            .inspect(name)
            .map(|obs| status_for(obs.state))
            .map_err(into_dispatch_error)?;

        if !request.action.is_legal_from(previous) {
            return Err(ControlError::InvalidTransition {
                container: name.to_string(),
                action: request.action.to_string(),
                status: previous.to_string(),
            });
        }

        let outcome = match request.action {
            Action::Create => {
                let spec = CreateSpec::new(self.image.as_str()).with_publish(request.publish);
                self.runtime.create(name, &spec)
            }
            Action::Start => self.runtime.start(name),
            Action::Stop => self.runtime.stop(name),
            Action::Remove => self.runtime.remove(name),
        };
        outcome.map_err(into_dispatch_error)?;
        Ok(previous)
    }
}

/// Engine failures keep their own kind; anything else is an action failure.
fn into_dispatch_error(err: ControlError) -> ControlError {
    match err {
        e @ (ControlError::RuntimeUnavailable { .. } | ControlError::ActionFailed { .. }) => e,
        other => ControlError::ActionFailed {
            detail: other.to_string(),
        },
    }
}
