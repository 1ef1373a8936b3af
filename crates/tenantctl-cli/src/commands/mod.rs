//! CLI command definitions and dispatch.

pub mod action;
pub mod health;
pub mod ps;
pub mod serve;
pub mod stats;
pub mod token;

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tenantctl_api::client::ControlClient;
use tenantctl_common::constants::{
    ADDR_ENV, BIN_NAME, DEFAULT_CLIENT_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR, TOKEN_ENV,
};
use tenantctl_common::error::ControlError;

/// tenantctl — operator console for per-tenant containers.
#[derive(Parser, Debug)]
#[command(name = "tctl", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the control server.
    Serve(serve::ServeArgs),
    /// List every tenant's container with its status and actions.
    Ps(ps::PsArgs),
    /// Show fleet statistics.
    Stats(stats::StatsArgs),
    /// Create, start, stop, or remove a tenant's container.
    Action(action::ActionArgs),
    /// Issue an operator bearer token.
    Token(token::TokenArgs),
    /// Check that the control server is up.
    Health(health::HealthArgs),
}

/// Connection options shared by the client commands.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Control server address.
    #[arg(long, env = ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub addr: String,

    /// Operator bearer token.
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    /// Seconds to wait for the server before giving up.
    #[arg(
        long,
        default_value_t = DEFAULT_CLIENT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

impl ConnectArgs {
    /// Builds a client for the configured server.
    pub fn client(&self) -> ControlClient {
        let client = ControlClient::new(self.addr.clone())
            .with_timeout(Duration::from_secs(self.timeout));
        match &self.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        }
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve::execute(args),
        Command::Ps(args) => ps::execute(&args),
        Command::Stats(args) => stats::execute(&args),
        Command::Action(args) => action::execute(&args),
        Command::Token(args) => token::execute(&args),
        Command::Health(args) => health::execute(&args),
    }
}

/// Turns a client error into an operator-facing message.
///
/// A rejected credential drops the operator back to the unauthenticated
/// state, so the message says how to get a new one.
pub fn client_error(err: ControlError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::anyhow!(
            "{err}\nYour credential was rejected. Issue a new one with `{BIN_NAME} token` \
             and export it as {TOKEN_ENV}."
        )
    } else {
        anyhow::anyhow!("{err}")
    }
}
