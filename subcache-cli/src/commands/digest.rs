//! `subcache digest <network>`: consumer view of one cached network.

use anyhow::{bail, Context as _, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use subcache_digest::{
    staleness::{self, format_age},
    DigestStore, FileDigestStore, PerSubscriberDigestStore,
};

use super::{parse_network, Context};

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Network ID.
    pub network: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct DigestJson {
    network: String,
    digest: String,
    last_renewed_at: String,
    status: &'static str,
    subscribers: Vec<SubscriberJson>,
}

#[derive(Serialize, Tabled)]
struct SubscriberJson {
    #[tabled(rename = "subscriber")]
    subscriber: String,
    #[tabled(rename = "digest")]
    digest: String,
}

impl DigestArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let network = parse_network(&self.network)?;
        let config = ctx.config()?;
        let store = FileDigestStore::at_home(&ctx.home);

        let Some(record) = store
            .get_digest(&network)
            .with_context(|| format!("failed to read digest of network '{network}'"))?
        else {
            bail!("network '{network}' has no cached digest; run `subcache renew`");
        };
        let subscribers = store
            .get_subscriber_digests(&network)
            .with_context(|| format!("failed to read subscriber digests of '{network}'"))?;

        let now = Utc::now();
        let signal = staleness::check(Some(record.last_renewed_at), now, config.update_interval());
        let rows: Vec<SubscriberJson> = subscribers
            .into_iter()
            .map(|entry| SubscriberJson {
                subscriber: entry.subscriber_id.to_string(),
                digest: entry.digest,
            })
            .collect();

        if self.json {
            let payload = DigestJson {
                network: network.to_string(),
                digest: record.digest,
                last_renewed_at: record.last_renewed_at.to_rfc3339(),
                status: signal.label(),
                subscribers: rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize digest JSON")?
            );
            return Ok(());
        }

        println!("{} {}", "network".bold(), network);
        println!("{} {}", "digest".bold(), record.digest);
        println!(
            "{} {} ({} ago, {})",
            "renewed".bold(),
            record.last_renewed_at.to_rfc3339(),
            format_age(record.last_renewed_at, now),
            signal.label(),
        );
        if rows.is_empty() {
            println!("No subscribers.");
            return Ok(());
        }
        println!("{} subscriber(s)", rows.len());
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
