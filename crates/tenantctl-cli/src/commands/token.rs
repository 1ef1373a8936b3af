//! `tctl token` — Issue an operator bearer token.

use std::path::PathBuf;

use clap::Args;
use tenantctl_api::auth::JwtAuthority;
use tenantctl_common::config::ControlConfig;
use tenantctl_common::constants::{DEFAULT_CONFIG_FILE, JWT_SECRET_ENV, TOKEN_ENV};

/// Arguments for the `token` command.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Operator name to put in the token subject.
    #[arg(default_value = "admin")]
    pub subject: String,

    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Signing secret (overrides `jwt_secret`).
    #[arg(long, env = JWT_SECRET_ENV, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds (overrides `token_lifetime_secs`).
    #[arg(long)]
    pub lifetime_secs: Option<u64>,
}

/// Executes the `token` command.
///
/// Prints only the token so it can be captured with `export`.
///
/// # Errors
///
/// Returns an error if no secret is configured.
#[allow(clippy::print_stdout)]
pub fn execute(args: &TokenArgs) -> anyhow::Result<()> {
    let mut config = ControlConfig::load_or_default(&args.config).map_err(|e| anyhow::anyhow!("{e}"))?;
    if let Some(secret) = &args.jwt_secret {
        config.jwt_secret = Some(secret.clone());
    }
    if let Some(lifetime) = args.lifetime_secs {
        config.token_lifetime_secs = lifetime;
    }

    if !config.operators.is_empty() && !config.operators.contains(&args.subject) {
        tracing::warn!(subject = %args.subject, "subject is not in the configured operators list; the server will reject this token");
    }

    let authority = JwtAuthority::from_config(&config).map_err(|e| anyhow::anyhow!("{e}"))?;
    let token = authority.issue(&args.subject).map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::info!(subject = %args.subject, lifetime_secs = config.token_lifetime_secs, "issued token; export it as {TOKEN_ENV}");
    println!("{token}");
    Ok(())
}
