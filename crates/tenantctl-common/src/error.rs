//! Unified error type for the tenantctl workspace.
//!
//! Every lifecycle failure an operator can observe has its own variant so
//! the control API can return it as a structured response instead of an
//! opaque message.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ControlError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path (or endpoint) where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The container engine could not be reached.
    #[error("container runtime unavailable: {reason}")]
    RuntimeUnavailable {
        /// Why the engine is considered unreachable.
        reason: String,
    },

    /// Another action is already in flight for this container.
    #[error("action '{in_flight}' already in progress for container {container}")]
    ActionInProgress {
        /// Container the request targeted.
        container: String,
        /// Action currently holding the container.
        in_flight: String,
    },

    /// The engine executed the call and reported a failure.
    #[error("action failed: {detail}")]
    ActionFailed {
        /// Detail string reported by the engine.
        detail: String,
    },

    /// The requested action has no legal transition from the current status.
    #[error("cannot {action} container {container} while it is {status}")]
    InvalidTransition {
        /// Container the request targeted.
        container: String,
        /// Requested action.
        action: String,
        /// Status the container was observed in.
        status: String,
    },

    /// The caller's credential was missing or rejected.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Why the credential was rejected.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The control server answered with an error.
    #[error("{message} ({kind}, {code})")]
    Remote {
        /// Status code reported by the server.
        code: u16,
        /// Error kind reported by the server.
        kind: String,
        /// Human-readable message.
        message: String,
    },
}

impl ControlError {
    /// Returns a stable snake_case identifier for this error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
            Self::NotFound { .. } => "not_found",
            Self::RuntimeUnavailable { .. } => "runtime_unavailable",
            Self::ActionInProgress { .. } => "action_in_progress",
            Self::ActionFailed { .. } => "action_failed",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Serialization { .. } => "serialization",
            Self::Remote { .. } => "remote",
        }
    }

    /// Returns the HTTP-equivalent status code for this error.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::ActionInProgress { .. } | Self::InvalidTransition { .. } => 409,
            Self::Config { .. } | Self::Serialization { .. } => 400,
            Self::RuntimeUnavailable { .. } => 503,
            Self::Io { .. } | Self::ActionFailed { .. } => 500,
            Self::Remote { code, .. } => *code,
        }
    }

    /// Returns whether re-issuing the same request later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ActionInProgress { .. } | Self::RuntimeUnavailable { .. }
        ) || matches!(self, Self::Remote { code: 409 | 503, .. })
    }

    /// Returns whether the caller's credential was rejected.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.code() == 401
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_is_a_conflict() {
        let err = ControlError::ActionInProgress {
            container: "acme".into(),
            in_flight: "stop".into(),
        };
        assert_eq!(err.code(), 409);
        assert_eq!(err.kind(), "action_in_progress");
        assert!(err.is_transient());
    }

    #[test]
    fn action_failed_keeps_engine_detail() {
        let err = ControlError::ActionFailed {
            detail: "No such container: acme".into(),
        };
        assert_eq!(err.to_string(), "action failed: No such container: acme");
        assert!(!err.is_transient());
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let err = ControlError::Unauthorized {
            message: "token expired".into(),
        };
        assert_eq!(err.code(), 401);
    }

    #[test]
    fn runtime_unavailable_maps_to_503() {
        let err = ControlError::RuntimeUnavailable {
            reason: "daemon not running".into(),
        };
        assert_eq!(err.code(), 503);
        assert_eq!(err.kind(), "runtime_unavailable");
    }

    #[test]
    fn remote_error_keeps_server_code() {
        let err = ControlError::Remote {
            code: 401,
            kind: "unauthorized".into(),
            message: "token expired".into(),
        };
        assert!(err.is_unauthorized());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "token expired (unauthorized, 401)");
    }
}
