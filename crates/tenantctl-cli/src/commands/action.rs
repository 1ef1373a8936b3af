//! `tctl action` — Run a lifecycle action on one tenant's container.

use std::io::IsTerminal;

use clap::Args;
use tenantctl_common::types::Action;

use super::{ConnectArgs, client_error};
use crate::output;

/// Arguments for the `action` command.
#[derive(Args, Debug)]
pub struct ActionArgs {
    /// Container name (the tenant's subdomain).
    pub container: String,

    /// Action to run: create, start, stop, or remove.
    pub action: Action,

    /// Connection options.
    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// Executes the `action` command.
///
/// # Errors
///
/// Returns an error if the server rejects or fails the action.
#[allow(clippy::print_stdout)]
pub fn execute(args: &ActionArgs) -> anyhow::Result<()> {
    let response = args
        .connect
        .client()
        .invoke(&args.container, args.action)
        .map_err(|e| {
            if e.is_transient() {
                tracing::info!(container = %args.container, "retry once the container settles");
            }
            client_error(e)
        })?;

    let color = std::io::stdout().is_terminal();
    println!("{}", response.message);
    println!(
        "  {} -> {}  actions: {}",
        output::format_status(response.previous, color).trim_end(),
        output::format_status(response.container.status, color).trim_end(),
        output::format_actions(&response.container.actions),
    );
    tracing::debug!(request_id = %response.request_id, "action completed");
    Ok(())
}
