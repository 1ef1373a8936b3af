//! TCP server for the control API.
//!
//! Each connection gets its own thread and may carry any number of
//! newline-terminated requests. Handlers run synchronously on that thread,
//! so a slow engine call only ever stalls the connection that made it.
//! A connection that sends nothing for the idle timeout is closed.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tenantctl_common::constants::DEFAULT_IDLE_TIMEOUT_SECS;
use tenantctl_common::error::{ControlError, Result};

use crate::protocol::{ActionParams, Request, Response, methods};
use crate::service::ControlService;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// A bound control server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    service: Arc<ControlService>,
    idle_timeout: Duration,
}

impl Server {
    /// Binds to `addr`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the address cannot be bound.
    pub fn bind(addr: &str, service: Arc<ControlService>) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| io_error(addr, e))?;
        Ok(Self {
            listener,
            service,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        })
    }

    /// Closes connections that stay silent for `timeout`.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Returns the address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| io_error("listener", e))
    }

    /// Accepts connections until `shutdown` is set.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be configured.
    pub fn serve(self, shutdown: &AtomicBool) -> Result<()> {
        self.listener
            .set_nonblocking(true)
            .map_err(|e| io_error("listener", e))?;
        tracing::info!(addr = ?self.listener.local_addr().ok(), "control API listening");

        while !shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let service = Arc::clone(&self.service);
                    let idle_timeout = self.idle_timeout;
                    let _handle = std::thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, &service, idle_timeout) {
                            tracing::debug!(%peer, error = %e, "connection closed with error");
                        }
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }

        tracing::info!("control API stopped");
        Ok(())
    }
}

/// Serves requests from one connection until the peer hangs up or idles out.
fn handle_connection(
    stream: TcpStream,
    service: &ControlService,
    idle_timeout: Duration,
) -> Result<()> {
    stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_read_timeout(Some(idle_timeout)))
        .map_err(|e| io_error("connection", e))?;
    let mut writer = stream.try_clone().map_err(|e| io_error("connection", e))?;
    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                tracing::debug!(idle_secs = idle_timeout.as_secs(), "idle connection closed");
                return Ok(());
            }
            Err(e) => return Err(io_error("connection", e)),
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(service, &request),
            Err(e) => Response::err(&ControlError::from(e)),
        };
        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        writer
            .write_all(payload.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| io_error("connection", e))?;
    }
    Ok(())
}

/// Routes one request to the service.
pub fn handle_request(service: &ControlService, request: &Request) -> Response {
    let method = request.method.as_str();
    let result = route(service, request);
    if let Err(e) = &result {
        tracing::debug!(method, code = e.code(), error = %e, "request failed");
    }
    Response::from_result(result)
}

fn route(service: &ControlService, request: &Request) -> Result<serde_json::Value> {
    if request.method == methods::HEALTH {
        return Ok(serde_json::to_value(service.health())?);
    }

    let operator = service.authenticate(request.token.as_deref())?;
    match request.method.as_str() {
        methods::LIST_CONTAINERS => Ok(serde_json::to_value(service.list_containers(&operator)?)?),
        methods::STATS => Ok(serde_json::to_value(service.fleet_stats(&operator)?)?),
        methods::ACTION => {
            let params: ActionParams = serde_json::from_value(request.params.clone())?;
            let response = service.invoke(&operator, &params.container, params.action)?;
            Ok(serde_json::to_value(response)?)
        }
        other => Err(ControlError::NotFound {
            kind: "method",
            id: other.to_string(),
        }),
    }
}

fn io_error(path: &str, source: std::io::Error) -> ControlError {
    ControlError::Io {
        path: PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::Instant;

    use tenantctl_runtime::backend::ContainerRuntime;
    use tenantctl_runtime::backend::memory::MemoryRuntime;

    use super::*;
    use crate::auth::JwtAuthority;
    use crate::tenants::MemoryTenantStore;

    fn service() -> (ControlService, String) {
        let authority = Arc::new(JwtAuthority::new("secret", 3600));
        let token = authority.issue("admin").unwrap();
        let service = ControlService::new(
            Arc::new(MemoryTenantStore::default()),
            Arc::new(MemoryRuntime::new()) as Arc<dyn ContainerRuntime>,
            authority,
            "nginx:alpine",
        );
        (service, token)
    }

    fn request(method: &str, token: Option<&str>) -> Request {
        Request {
            method: method.into(),
            token: token.map(str::to_string),
            params: serde_json::Value::Null,
        }
    }

    #[test]
    fn health_needs_no_token() {
        let (svc, _) = service();
        let response = handle_request(&svc, &request(methods::HEALTH, None));
        assert!(response.error.is_none());
    }

    #[test]
    fn protected_methods_need_token() {
        let (svc, _) = service();
        for method in [methods::LIST_CONTAINERS, methods::STATS, methods::ACTION] {
            let response = handle_request(&svc, &request(method, None));
            assert_eq!(response.error.unwrap().code, 401);
        }
    }

    #[test]
    fn unknown_method_is_not_found() {
        let (svc, token) = service();
        let response = handle_request(&svc, &request("containers.restart", Some(&token)));
        let error = response.error.unwrap();
        assert_eq!(error.code, 404);
        assert_eq!(error.message, "method not found: containers.restart");
    }

    #[test]
    fn silent_connection_is_closed_after_idle_timeout() {
        let (svc, _) = service();
        let server = Server::bind("127.0.0.1:0", Arc::new(svc))
            .unwrap()
            .with_idle_timeout(Duration::from_millis(200));
        let addr = server.local_addr().unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || server.serve(&flag));

        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let started = Instant::now();
        let mut buf = [0_u8; 16];
        let read = client.read(&mut buf).unwrap();
        assert_eq!(read, 0, "server should hang up on an idle client");
        assert!(started.elapsed() < Duration::from_secs(5));

        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn malformed_action_params_are_bad_request() {
        let (svc, token) = service();
        let mut req = request(methods::ACTION, Some(&token));
        req.params = serde_json::json!({ "container": "acme", "action": "restart" });
        let response = handle_request(&svc, &req);
        assert_eq!(response.error.unwrap().code, 400);
    }
}
