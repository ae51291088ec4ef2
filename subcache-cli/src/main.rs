//! subcache: subscriber digest cache CLI.
//!
//! # Usage
//!
//! ```text
//! subcache network create|delete|list
//! subcache subscriber add|remove <network> <imsi> [...]
//! subcache apn add|remove <network> <name> [...]
//! subcache renew [--json]
//! subcache digest <network> [--json]
//! subcache networks [--json]
//! subcache daemon start|status
//! ```
//!
//! Every command accepts `--config <path>` to override
//! `~/.subcache/config.yaml`.

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    apn::ApnCommand, daemon::DaemonCommand, digest::DigestArgs, network::NetworkCommand,
    networks::NetworksArgs, renew::RenewArgs, subscriber::SubscriberCommand, Context,
};
use subcache_core::SubscriptionState;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "subcache",
    version,
    about = "Maintain TTL-refreshed network and subscriber digests",
    long_about = None,
)]
struct Cli {
    /// Renewal config file (defaults to ~/.subcache/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, delete and list networks in the local directory.
    Network {
        #[command(subcommand)]
        command: NetworkCommand,
    },

    /// Add or remove subscribers of a network.
    Subscriber {
        #[command(subcommand)]
        command: SubscriberCommand,
    },

    /// Add or remove APN configurations of a network.
    Apn {
        #[command(subcommand)]
        command: ApnCommand,
    },

    /// Run exactly one renewal pass.
    Renew(RenewArgs),

    /// Show the cached digests of one network.
    Digest(DigestArgs),

    /// Show every known network with its staleness.
    Networks(NetworksArgs),

    /// Run or inspect the renewal scheduler.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared SubscriptionState argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `SubscriptionState` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateArg(pub SubscriptionState);

impl FromStr for StateArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self(SubscriptionState::Active)),
            "inactive" => Ok(Self(SubscriptionState::Inactive)),
            other => Err(format!(
                "unknown subscription state '{other}'; expected: active, inactive"
            )),
        }
    }
}

impl fmt::Display for StateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context::new(cli.config)?;
    match cli.command {
        Commands::Network { command } => commands::network::run(&ctx, command),
        Commands::Subscriber { command } => commands::subscriber::run(&ctx, command),
        Commands::Apn { command } => commands::apn::run(&ctx, command),
        Commands::Renew(args) => args.run(&ctx),
        Commands::Digest(args) => args.run(&ctx),
        Commands::Networks(args) => args.run(&ctx),
        Commands::Daemon { command } => commands::daemon::run(&ctx, command),
    }
}
