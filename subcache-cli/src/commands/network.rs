//! `subcache network create|delete|list`

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use subcache_core::{directory, EntityKind};

use super::{parse_network, Context};

#[derive(Subcommand, Debug)]
pub enum NetworkCommand {
    /// Create an empty network (no-op if it already exists).
    Create(CreateArgs),

    /// Delete a network and all of its entities.
    Delete {
        /// Network ID.
        network: String,
    },

    /// List networks in the directory with their entity counts.
    List,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Network ID (used as the file name of the network document).
    pub network: String,

    /// Human-readable display name.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "network")]
    network: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "subscribers")]
    subscribers: usize,
    #[tabled(rename = "apns")]
    apns: usize,
    #[tabled(rename = "updated")]
    updated: String,
}

pub fn run(ctx: &Context, cmd: NetworkCommand) -> Result<()> {
    match cmd {
        NetworkCommand::Create(args) => create(ctx, args),
        NetworkCommand::Delete { network } => delete(ctx, &network),
        NetworkCommand::List => list(ctx),
    }
}

fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    let id = parse_network(&args.network)?;
    let existed = directory::network_path_at(&ctx.home, &id).exists();
    directory::create_network_at(&ctx.home, id.clone(), args.name)
        .with_context(|| format!("failed to create network '{id}'"))?;
    if existed {
        println!("network '{id}' already exists");
    } else {
        println!("created network '{id}'");
    }
    Ok(())
}

fn delete(ctx: &Context, raw: &str) -> Result<()> {
    let id = parse_network(raw)?;
    let removed = directory::delete_network_at(&ctx.home, &id)
        .with_context(|| format!("failed to delete network '{id}'"))?;
    if removed {
        println!("deleted network '{id}'");
    } else {
        println!("network '{id}' does not exist");
    }
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let ids = directory::list_network_ids_at(&ctx.home).context("failed to list networks")?;
    if ids.is_empty() {
        println!("No networks in directory.");
        println!("Run: subcache network create <id>");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(ids.len());
    for id in &ids {
        let doc = directory::load_network_at(&ctx.home, id)
            .with_context(|| format!("failed to load network '{id}'"))?;
        let count = |kind| doc.entities.iter().filter(|e| e.kind() == kind).count();
        rows.push(NetworkRow {
            network: id.to_string(),
            name: doc.name.clone().unwrap_or_default(),
            subscribers: count(EntityKind::Subscriber),
            apns: count(EntityKind::Apn),
            updated: doc.updated_at.to_rfc3339(),
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
