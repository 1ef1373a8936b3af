//! `tctl ps` — List every tenant's container.

use std::io::IsTerminal;

use clap::Args;

use super::{ConnectArgs, client_error};
use crate::output;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Connection options.
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Print raw JSON records instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the server is unreachable or rejects the credential.
#[allow(clippy::print_stdout)]
pub fn execute(args: &PsArgs) -> anyhow::Result<()> {
    let records = args
        .connect
        .client()
        .list_containers()
        .map_err(client_error)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No tenants registered.");
        return Ok(());
    }
    if records.iter().any(|r| !r.docker_available) {
        tracing::warn!("container engine unreachable; statuses are unknown");
    }
    print!(
        "{}",
        output::containers_table(&records, std::io::stdout().is_terminal())
    );
    Ok(())
}
