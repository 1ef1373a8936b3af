//! Blocking client for the control API.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tenantctl_common::constants::DEFAULT_CLIENT_TIMEOUT_SECS;
use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::{Action, ContainerRecord, FleetStats};

use crate::protocol::{ActionParams, Request, Response, methods};
use crate::service::{ActionResponse, Health};

/// Default I/O timeout per call. Covers a slow engine call on the server.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS);

/// Client for one control server.
///
/// Every call opens a fresh connection, so a client is cheap to share.
#[derive(Debug, Clone)]
pub struct ControlClient {
    addr: String,
    token: Option<String>,
    timeout: Duration,
}

impl ControlClient {
    /// Creates a client for the server at `addr`.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Attaches a bearer token to every call.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the per-call I/O timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Calls `health`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the server cannot be reached.
    pub fn health(&self) -> Result<Health> {
        self.call(methods::HEALTH, serde_json::Value::Null)
    }

    /// Calls `containers.list`.
    ///
    /// # Errors
    ///
    /// Returns the server's error, or an I/O error.
    pub fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        self.call(methods::LIST_CONTAINERS, serde_json::Value::Null)
    }

    /// Calls `stats`.
    ///
    /// # Errors
    ///
    /// Returns the server's error, or an I/O error.
    pub fn fleet_stats(&self) -> Result<FleetStats> {
        self.call(methods::STATS, serde_json::Value::Null)
    }

    /// Calls `containers.action`.
    ///
    /// # Errors
    ///
    /// Returns the server's error, or an I/O error.
    pub fn invoke(&self, container: &str, action: Action) -> Result<ActionResponse> {
        let params = serde_json::to_value(ActionParams {
            container: container.to_string(),
            action,
        })?;
        self.call(methods::ACTION, params)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = Request {
            method: method.to_string(),
            token: self.token.clone(),
            params,
        };
        let mut payload = serde_json::to_string(&request)?;
        payload.push('\n');

        let stream = self.connect()?;
        let mut writer = stream.try_clone().map_err(|e| self.io_error(e))?;
        writer
            .write_all(payload.as_bytes())
            .map_err(|e| self.io_error(e))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|e| self.io_error(e))?;
        if read == 0 {
            return Err(self.io_error(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "server closed the connection without answering",
            )));
        }

        let response: Response = serde_json::from_str(&line)?;
        let value = response.into_result().inspect_err(|e| {
            if e.is_unauthorized() {
                tracing::debug!(method, "credential rejected by server");
            }
        })?;
        Ok(serde_json::from_value(value)?)
    }

    fn connect(&self) -> Result<TcpStream> {
        let addr = self
            .addr
            .to_socket_addrs()
            .map_err(|e| self.io_error(e))?
            .next()
            .ok_or_else(|| ControlError::Config {
                message: format!("address '{}' did not resolve", self.addr),
            })?;
        let stream =
            TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| self.io_error(e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| self.io_error(e))?;
        Ok(stream)
    }

    fn io_error(&self, source: std::io::Error) -> ControlError {
        ControlError::Io {
            path: PathBuf::from(&self.addr),
            source,
        }
    }
}
