//! Runtime adapter driving the `docker` CLI.
//!
//! Each adapter call runs one `docker` child process. A missing binary, a
//! daemon connection error, or a call that outlives the configured timeout
//! is reported as an unreachable runtime; every other non-zero exit is an
//! action failure carrying the engine's stderr.
//!
//! A call that times out is killed and reaped before the error is returned,
//! so no engine process outlives the action that started it.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tenantctl_common::constants::{DOCKER_BINARY, SHORT_ID_LENGTH};
use tenantctl_common::error::{ControlError, Result};
use tenantctl_common::types::RuntimeState;

use super::{ContainerObservation, ContainerRuntime, CreateSpec, Snapshot};

/// Interval between exit checks while an engine call runs.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Stderr fragments printed by the CLI when it cannot reach the daemon.
const DAEMON_UNREACHABLE_MARKERS: [&str; 4] = [
    "Cannot connect to the Docker daemon",
    "Is the docker daemon running",
    "error during connect",
    "permission denied while trying to connect",
];

/// Runtime adapter backed by the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl DockerRuntime {
    /// Creates an adapter that looks `docker` up on `PATH` for every call.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            binary: None,
            timeout,
        }
    }

    /// Creates an adapter that invokes the given binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: Some(binary.into()),
            timeout,
        }
    }

    /// Resolves the binary to invoke.
    fn locate(&self) -> Result<PathBuf> {
        if let Some(binary) = &self.binary {
            return Ok(binary.clone());
        }
        which::which(DOCKER_BINARY).map_err(|_| ControlError::RuntimeUnavailable {
            reason: format!("{DOCKER_BINARY} binary not found on PATH"),
        })
    }

    /// Runs one engine command and returns its stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        let binary = self.locate()?;
        tracing::debug!(binary = %binary.display(), ?args, "invoking container engine");

        let child = Command::new(&binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ControlError::RuntimeUnavailable {
                reason: format!("failed to launch {}: {e}", binary.display()),
            })?;

        let output = self.wait_with_timeout(child)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("{} {} exited with {}", binary.display(), args.join(" "), output.status)
        } else {
            stderr
        };
        Err(classify_failure(detail))
    }

    /// Waits for the child to exit, killing it once the timeout passes.
    ///
    /// Both pipes are drained on helper threads so a chatty child cannot
    /// fill a pipe and stall before exiting.
    fn wait_with_timeout(&self, mut child: Child) -> Result<EngineOutput> {
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let deadline = Instant::now() + self.timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    reap(&mut child);
                    tracing::warn!(
                        pid = child.id(),
                        timeout = ?self.timeout,
                        "container engine timed out, call killed"
                    );
                    return Err(ControlError::RuntimeUnavailable {
                        reason: format!(
                            "engine did not answer within {:.1}s",
                            self.timeout.as_secs_f64()
                        ),
                    });
                }
                Ok(None) => std::thread::sleep(WAIT_POLL),
                Err(e) => {
                    reap(&mut child);
                    return Err(ControlError::RuntimeUnavailable {
                        reason: format!("engine call failed: {e}"),
                    });
                }
            }
        };

        Ok(EngineOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    /// Lists containers, optionally narrowed by a `name=` filter.
    fn list(&self, name_filter: Option<&str>) -> Result<Snapshot> {
        let filter = name_filter.map(|name| format!("name={name}"));
        let mut args = vec!["ps", "-a", "--no-trunc", "--format", "{{json .}}"];
        if let Some(filter) = filter.as_deref() {
            args.extend(["--filter", filter]);
        }
        let stdout = self.run(&args)?;
        Ok(parse_ps_output(&stdout))
    }
}

impl ContainerRuntime for DockerRuntime {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn inspect(&self, name: &str) -> Result<ContainerObservation> {
        // The name filter matches substrings, so the exact name is looked up.
        let mut containers = self.list(Some(name))?;
        Ok(containers
            .remove(name)
            .unwrap_or_else(|| ContainerObservation::absent(name)))
    }

    fn snapshot(&self) -> Result<Snapshot> {
        self.list(None)
    }

    fn create(&self, name: &str, spec: &CreateSpec) -> Result<()> {
        tracing::info!(
            name,
            image = %spec.image,
            publish = ?spec.publish,
            "creating container (docker)"
        );
        let args = create_args(name, spec);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let _id = self.run(&args)?;
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        tracing::info!(name, "starting container (docker)");
        let _out = self.run(&["start", name])?;
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        tracing::info!(name, "stopping container (docker)");
        let _out = self.run(&["stop", name])?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        tracing::info!(name, "removing container (docker)");
        let _out = self.run(&["rm", "-f", name])?;
        Ok(())
    }
}

/// What a finished engine call produced.
struct EngineOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Reads a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Kills the child and waits for it so it leaves no zombie behind.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "engine process already gone");
    }
    let _ = child.wait();
}

/// Arguments for `docker create`, publishing the tenant port when set.
fn create_args(name: &str, spec: &CreateSpec) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), name.to_string()];
    if let Some(binding) = spec.publish {
        args.push("-p".to_string());
        args.push(binding.to_string());
    }
    args.push(spec.image.clone());
    args
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "CreatedAt", default)]
    created_at: String,
}

/// Parses `docker ps` JSON lines into observations, skipping malformed lines.
fn parse_ps_output(stdout: &str) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: PsLine = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparseable engine output line");
                continue;
            }
        };
        // Linked containers list several comma-separated names; the first is canonical.
        let name = entry.names.split(',').next().unwrap_or_default().trim().to_string();
        if name.is_empty() {
            continue;
        }
        let observation = ContainerObservation {
            name: name.clone(),
            state: map_state(&entry.state),
            id: Some(entry.id.chars().take(SHORT_ID_LENGTH).collect()),
            image: non_empty(entry.image),
            ports: Some(entry.ports),
            created: non_empty(entry.created_at),
        };
        let _ = snapshot.insert(name, observation);
    }
    snapshot
}

/// Maps an engine state string onto the four states the core models.
fn map_state(state: &str) -> RuntimeState {
    match state.to_ascii_lowercase().as_str() {
        "created" => RuntimeState::Created,
        "running" | "paused" | "restarting" => RuntimeState::Running,
        "exited" | "dead" | "removing" => RuntimeState::Exited,
        other => {
            tracing::warn!(state = other, "unrecognized engine state, treating as exited");
            RuntimeState::Exited
        }
    }
}

/// Decides whether a failed call means the engine itself is unreachable.
fn classify_failure(detail: String) -> ControlError {
    if DAEMON_UNREACHABLE_MARKERS
        .iter()
        .any(|marker| detail.contains(marker))
    {
        ControlError::RuntimeUnavailable { reason: detail }
    } else {
        ControlError::ActionFailed { detail }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}
