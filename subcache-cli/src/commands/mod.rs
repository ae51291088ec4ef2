pub mod apn;
pub mod daemon;
pub mod digest;
pub mod network;
pub mod networks;
pub mod renew;
pub mod subscriber;

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use subcache_core::{config, NetworkId, RenewalConfig};

/// Resolved home directory plus the optional `--config` override.
#[derive(Debug)]
pub struct Context {
    pub home: PathBuf,
    config_override: Option<PathBuf>,
}

impl Context {
    pub fn new(config_override: Option<PathBuf>) -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(Self {
            home,
            config_override,
        })
    }

    pub fn config(&self) -> Result<RenewalConfig> {
        let path = self
            .config_override
            .clone()
            .unwrap_or_else(|| config::config_path_at(&self.home));
        config::load_from(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))
    }
}

pub fn parse_network(raw: &str) -> Result<NetworkId> {
    let id = NetworkId::from(raw);
    if !id.is_valid() {
        bail!("invalid network id '{raw}'");
    }
    Ok(id)
}
