//! `subcache subscriber add|remove`

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};

use subcache_core::{
    directory, Entity, EntityKind, LteSubscription, SubscriberConfig, SubscriberEntity,
};

use super::{parse_network, Context};
use crate::StateArg;

#[derive(Subcommand, Debug)]
pub enum SubscriberCommand {
    /// Add a subscriber, replacing any existing one with the same IMSI.
    Add(AddArgs),

    /// Remove a subscriber.
    Remove {
        /// Network ID.
        network: String,
        /// IMSI, with or without the `IMSI` prefix.
        imsi: String,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Network ID.
    pub network: String,

    /// IMSI, with or without the `IMSI` prefix (e.g. `IMSI001010000000001`).
    pub imsi: String,

    /// LTE subscription state: active | inactive.
    #[arg(long, default_value = "active")]
    pub state: StateArg,

    /// Hex-encoded authentication key.
    #[arg(long, default_value = "")]
    pub auth_key: String,

    /// Hex-encoded operator key.
    #[arg(long, default_value = "")]
    pub auth_opc: String,

    /// Subscriber profile name.
    #[arg(long)]
    pub profile: Option<String>,

    /// APN the subscriber may attach to. Repeatable.
    #[arg(long = "apn", value_name = "NAME")]
    pub apns: Vec<String>,
}

pub fn run(ctx: &Context, cmd: SubscriberCommand) -> Result<()> {
    match cmd {
        SubscriberCommand::Add(args) => add(ctx, args),
        SubscriberCommand::Remove { network, imsi } => remove(ctx, &network, &imsi),
    }
}

fn add(ctx: &Context, args: AddArgs) -> Result<()> {
    let network = parse_network(&args.network)?;
    let key = imsi_key(&args.imsi)?;
    let entity = Entity::Subscriber(SubscriberEntity {
        key: key.clone(),
        pk: None,
        config: SubscriberConfig {
            lte: Some(LteSubscription {
                state: args.state.0,
                auth_key: args.auth_key,
                auth_opc: args.auth_opc,
                sub_profile: args.profile,
            }),
            active_apns: args.apns,
        },
    });
    directory::upsert_entities_at(&ctx.home, &network, vec![entity])
        .with_context(|| format!("failed to add subscriber {key} to network '{network}'"))?;
    println!("added subscriber {key} to network '{network}' ({})", args.state);
    Ok(())
}

fn remove(ctx: &Context, raw_network: &str, imsi: &str) -> Result<()> {
    let network = parse_network(raw_network)?;
    let key = imsi_key(imsi)?;
    let removed = directory::remove_entity_at(&ctx.home, &network, EntityKind::Subscriber, &key)
        .with_context(|| format!("failed to remove subscriber {key} from network '{network}'"))?;
    if removed {
        println!("removed subscriber {key} from network '{network}'");
    } else {
        println!("subscriber {key} not found in network '{network}'");
    }
    Ok(())
}

/// Normalize to the `IMSI<digits>` entity key.
fn imsi_key(raw: &str) -> Result<String> {
    let digits = raw.strip_prefix("IMSI").unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid IMSI '{raw}'; expected digits, optionally prefixed with IMSI");
    }
    Ok(format!("IMSI{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imsi_prefix_is_optional() {
        assert_eq!(imsi_key("001010000000001").unwrap(), "IMSI001010000000001");
        assert_eq!(imsi_key("IMSI11111").unwrap(), "IMSI11111");
    }

    #[test]
    fn non_digit_imsi_is_rejected() {
        assert!(imsi_key("IMSI").is_err());
        assert!(imsi_key("IMSI12a4").is_err());
        assert!(imsi_key("imsi123").is_err());
    }
}
