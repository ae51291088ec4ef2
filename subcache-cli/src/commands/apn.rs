//! `subcache apn add|remove`

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};

use subcache_core::{
    directory,
    types::{AggregatedMaximumBitrate, QosProfile},
    ApnConfiguration, ApnEntity, Entity, EntityKind,
};

use super::{parse_network, Context};

#[derive(Subcommand, Debug)]
pub enum ApnCommand {
    /// Add an APN, replacing any existing one with the same name.
    Add(AddArgs),

    /// Remove an APN. Subscribers still referencing it will fail to renew.
    Remove {
        /// Network ID.
        network: String,
        /// APN name.
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Network ID.
    pub network: String,

    /// APN name (service selection), e.g. `internet`.
    pub name: String,

    /// Uplink aggregated maximum bitrate.
    #[arg(long, requires = "ambr_dl")]
    pub ambr_ul: Option<u32>,

    /// Downlink aggregated maximum bitrate.
    #[arg(long, requires = "ambr_ul")]
    pub ambr_dl: Option<u32>,

    /// QoS class identifier.
    #[arg(long)]
    pub class_id: Option<i32>,

    /// QoS priority level.
    #[arg(long, default_value_t = 15)]
    pub priority_level: u32,

    #[arg(long)]
    pub preemption_capability: bool,

    #[arg(long)]
    pub preemption_vulnerability: bool,
}

pub fn run(ctx: &Context, cmd: ApnCommand) -> Result<()> {
    match cmd {
        ApnCommand::Add(args) => add(ctx, args),
        ApnCommand::Remove { network, name } => remove(ctx, &network, &name),
    }
}

fn add(ctx: &Context, args: AddArgs) -> Result<()> {
    let network = parse_network(&args.network)?;
    if args.name.is_empty() {
        bail!("APN name must not be empty");
    }

    let ambr = match (args.ambr_ul, args.ambr_dl) {
        (Some(ul), Some(dl)) => Some(AggregatedMaximumBitrate {
            max_bandwidth_ul: ul,
            max_bandwidth_dl: dl,
        }),
        _ => None,
    };
    let qos_profile = args.class_id.map(|class_id| QosProfile {
        class_id,
        priority_level: args.priority_level,
        preemption_capability: args.preemption_capability,
        preemption_vulnerability: args.preemption_vulnerability,
    });

    let entity = Entity::Apn(ApnEntity {
        key: args.name.clone(),
        pk: None,
        config: ApnConfiguration { ambr, qos_profile },
    });
    directory::upsert_entities_at(&ctx.home, &network, vec![entity])
        .with_context(|| format!("failed to add APN '{}' to network '{network}'", args.name))?;
    println!("added APN '{}' to network '{network}'", args.name);
    Ok(())
}

fn remove(ctx: &Context, raw_network: &str, name: &str) -> Result<()> {
    let network = parse_network(raw_network)?;
    let removed = directory::remove_entity_at(&ctx.home, &network, EntityKind::Apn, name)
        .with_context(|| format!("failed to remove APN '{name}' from network '{network}'"))?;
    if removed {
        println!("removed APN '{name}' from network '{network}'");
    } else {
        println!("APN '{name}' not found in network '{network}'");
    }
    Ok(())
}
