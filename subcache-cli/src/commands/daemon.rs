//! `subcache daemon`: foreground scheduler and its last recorded status.

use anyhow::{Context as _, Result};
use clap::Subcommand;

use subcache_daemon::{paths::status_path, read_status, start_blocking};

use super::Context;

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the renewal scheduler in the foreground until ctrl-c.
    Start,
    /// Print the status written after the most recent pass.
    Status,
}

pub fn run(ctx: &Context, command: DaemonCommand) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            let config = ctx.config()?;
            start_blocking(&ctx.home, config).context("daemon exited with error")?;
        }
        DaemonCommand::Status => {
            let payload = match read_status(&ctx.home).context("failed to read daemon status")? {
                Some(status) => serde_json::to_value(status)
                    .context("failed to render daemon status JSON")?,
                None => serde_json::json!({
                    "passes": 0,
                    "status_file": status_path(&ctx.home).display().to_string(),
                }),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .context("failed to render daemon status JSON")?
            );
        }
    }
    Ok(())
}
