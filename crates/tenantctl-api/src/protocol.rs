//! Wire format of the control API.
//!
//! One JSON object per line in each direction. A request names a method and
//! carries an optional bearer token; a response holds either `result` or
//! `error`, never both.

use serde::{Deserialize, Serialize};
use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::Action;

/// Method names understood by the server.
pub mod methods {
    /// Liveness probe. Unauthenticated.
    pub const HEALTH: &str = "health";
    /// List one record per tenant.
    pub const LIST_CONTAINERS: &str = "containers.list";
    /// Fleet counters.
    pub const STATS: &str = "stats";
    /// Invoke a lifecycle action.
    pub const ACTION: &str = "containers.action";
}

/// A single API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Method to call.
    pub method: String,
    /// Bearer credential, with or without the `Bearer ` prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Method parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Parameters of [`methods::ACTION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    /// Target container name.
    pub container: String,
    /// Requested action.
    pub action: Action,
}

/// Structured error returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP-equivalent status code.
    pub code: u16,
    /// Stable snake_case error kind.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&ControlError> for ErrorBody {
    fn from(err: &ControlError) -> Self {
        match err {
            ControlError::Remote {
                code,
                kind,
                message,
            } => Self {
                code: *code,
                kind: kind.clone(),
                message: message.clone(),
            },
            other => Self {
                code: other.code(),
                kind: other.kind().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<ErrorBody> for ControlError {
    fn from(body: ErrorBody) -> Self {
        Self::Remote {
            code: body.code,
            kind: body.kind,
            message: body.message,
        }
    }
}

/// A single API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Builds a success response.
    #[must_use]
    pub const fn ok(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn err(error: &ControlError) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }

    /// Converts a handler result into a response.
    #[must_use]
    pub fn from_result(result: Result<serde_json::Value>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::err(&e),
        }
    }

    /// Splits the response back into a result on the client side.
    ///
    /// # Errors
    ///
    /// Returns `Remote` carrying the server's error body.
    pub fn into_result(self) -> Result<serde_json::Value> {
        match (self.error, self.result) {
            (Some(body), _) => Err(body.into()),
            (None, Some(value)) => Ok(value),
            (None, None) => Ok(serde_json::Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_token_or_params_parses() {
        let request: Request = serde_json::from_str(r#"{"method":"health"}"#).unwrap();
        assert_eq!(request.method, methods::HEALTH);
        assert!(request.token.is_none());
        assert!(request.params.is_null());
    }

    #[test]
    fn action_params_use_wire_names() {
        let params: ActionParams =
            serde_json::from_str(r#"{"container":"acme","action":"remove"}"#).unwrap();
        assert_eq!(params.action, Action::Remove);
    }

    #[test]
    fn error_response_carries_code_and_kind() {
        let err = ControlError::NotFound {
            kind: "container",
            id: "ghost".into(),
        };
        let line = serde_json::to_string(&Response::err(&err)).unwrap();
        assert_eq!(
            line,
            r#"{"error":{"code":404,"kind":"not_found","message":"container not found: ghost"}}"#
        );
    }

    #[test]
    fn error_body_round_trips_into_remote_error() {
        let response: Response =
            serde_json::from_str(r#"{"error":{"code":409,"kind":"action_in_progress","message":"busy"}}"#)
                .unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code(), 409);
        assert!(err.is_transient());
    }
}
