//! `tctl stats` — Show fleet statistics.

use clap::Args;

use super::{ConnectArgs, client_error};
use crate::output;

/// Arguments for the `stats` command.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Connection options.
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Print raw JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `stats` command.
///
/// # Errors
///
/// Returns an error if the server is unreachable or rejects the credential.
#[allow(clippy::print_stdout)]
pub fn execute(args: &StatsArgs) -> anyhow::Result<()> {
    let stats = args.connect.client().fleet_stats().map_err(client_error)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", output::stats_table(&stats));
    }
    Ok(())
}
