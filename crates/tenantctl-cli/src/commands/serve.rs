//! `tctl serve` — Run the control server.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Args;
use tenantctl_api::auth::JwtAuthority;
use tenantctl_api::server::Server;
use tenantctl_api::service::ControlService;
use tenantctl_api::tenants::JsonTenantStore;
use tenantctl_common::config::ControlConfig;
use tenantctl_common::constants::{DEFAULT_CONFIG_FILE, JWT_SECRET_ENV};
use tenantctl_runtime::backend::{RuntimeKind, build_runtime};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the YAML configuration file. Missing file means defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Address to listen on (overrides `listen_addr`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Tenant registration file (overrides `tenants_file`).
    #[arg(long)]
    pub tenants_file: Option<PathBuf>,

    /// Image for newly created containers (overrides `default_image`).
    #[arg(long)]
    pub image: Option<String>,

    /// Host port base for created containers (overrides `publish_port_base`).
    #[arg(long)]
    pub publish_port_base: Option<u16>,

    /// Container engine to drive.
    #[arg(long, default_value_t = RuntimeKind::Docker)]
    pub runtime: RuntimeKind,

    /// Token signing secret (overrides `jwt_secret`).
    #[arg(long, env = JWT_SECRET_ENV, hide_env_values = true)]
    pub jwt_secret: Option<String>,
}

impl ServeArgs {
    /// Loads the configuration file and layers flag overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or a value is invalid.
    pub fn resolve_config(&self) -> anyhow::Result<ControlConfig> {
        let mut config = ControlConfig::load_or_default(&self.config)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        if let Some(listen) = &self.listen {
            config.listen_addr.clone_from(listen);
        }
        if let Some(tenants_file) = &self.tenants_file {
            config.tenants_file.clone_from(tenants_file);
        }
        if let Some(image) = &self.image {
            config.default_image.clone_from(image);
        }
        if let Some(base) = self.publish_port_base {
            config.publish_port_base = Some(base);
        }
        if let Some(secret) = &self.jwt_secret {
            config.jwt_secret = Some(secret.clone());
        }
        config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(config)
    }
}

/// Executes the `serve` command.
///
/// Blocks until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the address cannot
/// be bound.
pub fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    let authority = JwtAuthority::from_config(&config).map_err(|e| anyhow::anyhow!("{e}"))?;
    let runtime = build_runtime(args.runtime, &config);
    let tenants = JsonTenantStore::new(config.tenants_file.clone());

    tracing::info!(
        listen = %config.listen_addr,
        tenants_file = %tenants.path().display(),
        image = %config.default_image,
        publish_port_base = ?config.publish_port_base,
        runtime = runtime.name(),
        "starting control server"
    );

    let service = ControlService::new(
        Arc::new(tenants),
        runtime,
        Arc::new(authority),
        &config.default_image,
    )
    .with_port_publishing(config.publishing());
    let server = Server::bind(&config.listen_addr, Arc::new(service))
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", config.listen_addr))?
        .with_idle_timeout(Duration::from_secs(config.idle_timeout_secs));

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    server.serve(&shutdown).map_err(|e| anyhow::anyhow!("{e}"))
}
