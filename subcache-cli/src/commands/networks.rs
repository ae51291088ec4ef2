//! `subcache networks`: staleness of every live or cached network.

use std::collections::BTreeSet;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use subcache_core::{DirectoryClient, FileDirectory, NetworkId};
use subcache_digest::{
    staleness::{self, format_age, format_duration},
    DigestStore, FileDigestStore, StalenessSignal,
};

use super::Context;

#[derive(Args, Debug)]
pub struct NetworksArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
struct NetworkStatus {
    network: NetworkId,
    live: bool,
    signal: StalenessSignal,
    last_renewed_at: Option<String>,
    age: String,
}

#[derive(Serialize)]
struct NetworkStatusJson {
    network: String,
    live: bool,
    status: String,
    last_renewed_at: Option<String>,
    age: String,
}

#[derive(Tabled)]
struct NetworkTableRow {
    #[tabled(rename = "network")]
    network: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "last renewed")]
    age: String,
    #[tabled(rename = "due in")]
    due_in: String,
}

impl NetworksArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let config = ctx.config()?;
        let directory = FileDirectory::new(&ctx.home);
        let store = FileDigestStore::at_home(&ctx.home);

        let live = directory
            .list_networks()
            .context("failed to list directory networks")?;
        let cached = store
            .list_networks()
            .context("failed to list cached networks")?;
        let all: BTreeSet<NetworkId> = live.iter().cloned().chain(cached).collect();

        let now = Utc::now();
        let mut rows = Vec::with_capacity(all.len());
        for network in all {
            let record = store
                .get_digest(&network)
                .with_context(|| format!("failed to read digest of network '{network}'"))?;
            let last = record.map(|r| r.last_renewed_at);
            rows.push(NetworkStatus {
                live: live.contains(&network),
                signal: staleness::check(last, now, config.update_interval()),
                last_renewed_at: last.map(|ts| ts.to_rfc3339()),
                age: last.map_or_else(|| "never".to_string(), |ts| format_age(ts, now)),
                network,
            });
        }

        if self.json {
            print_json(rows)
        } else {
            print_table(rows);
            Ok(())
        }
    }
}

fn print_json(rows: Vec<NetworkStatus>) -> Result<()> {
    let payload: Vec<NetworkStatusJson> = rows
        .into_iter()
        .map(|row| NetworkStatusJson {
            network: row.network.to_string(),
            live: row.live,
            status: status_key(&row).to_string(),
            last_renewed_at: row.last_renewed_at,
            age: row.age,
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize networks JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<NetworkStatus>) {
    if rows.is_empty() {
        println!("No networks.");
        return;
    }
    let due = rows.iter().filter(|r| r.live && r.signal.is_due()).count();
    let removed = rows.iter().filter(|r| !r.live).count();

    let table_rows: Vec<NetworkTableRow> = rows
        .iter()
        .map(|row| NetworkTableRow {
            network: row.network.to_string(),
            status: status_indicator(row),
            age: row.age.clone(),
            due_in: match row.signal {
                StalenessSignal::Current { due_in, .. } if row.live => format_duration(due_in),
                _ if row.live => "now".to_string(),
                _ => "-".to_string(),
            },
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if due > 0 || removed > 0 {
        println!(
            "{due} network(s) due, {removed} pending removal. Run 'subcache renew' to update."
        );
    }
}

fn status_key(row: &NetworkStatus) -> &'static str {
    if !row.live {
        return "removed";
    }
    match row.signal {
        StalenessSignal::NeverRenewed => "never_renewed",
        StalenessSignal::Stale { .. } => "stale",
        StalenessSignal::Current { .. } => "current",
    }
}

fn status_indicator(row: &NetworkStatus) -> String {
    match status_key(row) {
        "current" => "● current".green().to_string(),
        "stale" => "● stale".yellow().to_string(),
        "never_renewed" => "○ never renewed".bright_black().to_string(),
        _ => "✗ removed".red().to_string(),
    }
}
