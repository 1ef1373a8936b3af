//! `tctl health` — Check that the control server is up.

use clap::Args;
use tenantctl_common::constants::APP_NAME;

use super::{ConnectArgs, client_error};

/// Arguments for the `health` command.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Connection options.
    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// Executes the `health` command.
///
/// # Errors
///
/// Returns an error if the server cannot be reached.
#[allow(clippy::print_stdout)]
pub fn execute(args: &HealthArgs) -> anyhow::Result<()> {
    let health = args.connect.client().health().map_err(client_error)?;
    println!(
        "{} ({APP_NAME} {}, runtime {}, engine {})",
        health.status,
        health.version,
        health.runtime,
        if health.docker_available { "reachable" } else { "unreachable" },
    );
    Ok(())
}
