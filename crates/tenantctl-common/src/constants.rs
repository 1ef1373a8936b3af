//! System-wide constants and defaults.

/// Image used when a container is created without an explicit image, and
/// reported for records whose runtime does not name one.
pub const DEFAULT_IMAGE: &str = "nginx:alpine";

/// Default address the control server listens on.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8004";

/// Default path of the tenant registration file.
pub const DEFAULT_TENANTS_FILE: &str = "tenants.json";

/// Default path of the YAML configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "tenantctl.yaml";

/// Name of the container engine binary looked up on `PATH`.
pub const DOCKER_BINARY: &str = "docker";

/// Default I/O timeout for a single container engine call, in seconds.
pub const DEFAULT_RUNTIME_TIMEOUT_SECS: u64 = 10;

/// Default I/O timeout for one control API call from the CLI, in seconds.
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

/// Default bearer token lifetime, in seconds (24 hours).
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Host port base for published tenant containers; tenant `n` gets `base + n`.
pub const DEFAULT_PUBLISH_PORT_BASE: u16 = 8080;

/// Port the tenant application listens on inside its container.
pub const DEFAULT_CONTAINER_PORT: u16 = 80;

/// Default idle timeout for a control API connection, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Length of the short container id reported to operators.
pub const SHORT_ID_LENGTH: usize = 12;

/// Placeholder shown for fields the runtime could not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Environment variable holding the token signing secret.
pub const JWT_SECRET_ENV: &str = "TENANTCTL_JWT_SECRET";

/// Environment variable holding the operator's bearer token.
pub const TOKEN_ENV: &str = "TENANTCTL_TOKEN";

/// Environment variable holding the control server address.
pub const ADDR_ENV: &str = "TENANTCTL_ADDR";

/// Application name used in CLI output and log fields.
pub const APP_NAME: &str = "tenantctl";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tctl";
