//! Renewal configuration.
//!
//! Loaded from `<home>/.subcache/config.yaml`. A missing file yields
//! [`RenewalConfig::default`]; a present file must pass [`RenewalConfig::validate`].
//!
//! ```yaml
//! sleep_interval_secs: 60
//! update_interval_secs: 300
//! max_parallel_networks: 4
//! pass_timeout_secs: 120
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SLEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MAX_PARALLEL_NETWORKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenewalConfig {
    /// Delay between scheduler ticks. Only the daemon reads it.
    #[serde(default = "default_sleep_interval")]
    pub sleep_interval_secs: u64,
    /// Minimum age of a network digest before it is recomputed.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Upper bound on networks refreshed concurrently within one pass.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_networks: usize,
    /// Scheduled passes still running after this long are cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_timeout_secs: Option<u64>,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            sleep_interval_secs: DEFAULT_SLEEP_INTERVAL_SECS,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            max_parallel_networks: DEFAULT_MAX_PARALLEL_NETWORKS,
            pass_timeout_secs: None,
        }
    }
}

impl RenewalConfig {
    pub fn new(sleep_interval_secs: u64, update_interval_secs: u64) -> Self {
        Self {
            sleep_interval_secs,
            update_interval_secs,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "update_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.sleep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sleep_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_parallel_networks == 0 {
            return Err(ConfigError::Invalid(
                "max_parallel_networks must be at least 1".to_string(),
            ));
        }
        if self.pass_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "pass_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_interval_secs)
    }

    pub fn pass_timeout(&self) -> Option<Duration> {
        self.pass_timeout_secs.map(Duration::from_secs)
    }
}

fn default_sleep_interval() -> u64 {
    DEFAULT_SLEEP_INTERVAL_SECS
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL_NETWORKS
}

/// `<home>/.subcache/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".subcache").join("config.yaml")
}

/// Load and validate the config at `path`; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<RenewalConfig, ConfigError> {
    if !path.exists() {
        return Ok(RenewalConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: RenewalConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Load the config from its default location under `home`.
pub fn load_at(home: &Path) -> Result<RenewalConfig, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<RenewalConfig, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("home");
        let config = load_at(home.path()).expect("load");
        assert_eq!(config, RenewalConfig::default());
        assert_eq!(config.update_interval(), Duration::from_secs(300));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let home = TempDir::new().expect("home");
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "update_interval_secs: 30\n").unwrap();

        let config = load_at(home.path()).expect("load");
        assert_eq!(config.update_interval_secs, 30);
        assert_eq!(config.sleep_interval_secs, DEFAULT_SLEEP_INTERVAL_SECS);
        assert_eq!(config.max_parallel_networks, DEFAULT_MAX_PARALLEL_NETWORKS);
        assert_eq!(config.pass_timeout(), None);
    }

    #[test]
    fn unknown_field_is_parse_error_with_path() {
        let home = TempDir::new().expect("home");
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "update_interval: 30\n").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[rstest]
    #[case(RenewalConfig { update_interval_secs: 0, ..RenewalConfig::default() }, "update_interval_secs")]
    #[case(RenewalConfig { sleep_interval_secs: 0, ..RenewalConfig::default() }, "sleep_interval_secs")]
    #[case(RenewalConfig { max_parallel_networks: 0, ..RenewalConfig::default() }, "max_parallel_networks")]
    #[case(RenewalConfig { pass_timeout_secs: Some(0), ..RenewalConfig::default() }, "pass_timeout_secs")]
    fn validate_rejects_zero_values(#[case] config: RenewalConfig, #[case] field: &str) {
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(field), "got: {err}");
    }

    #[test]
    fn new_keeps_other_defaults() {
        let config = RenewalConfig::new(5, 300);
        assert_eq!(config.sleep_interval(), Duration::from_secs(5));
        assert_eq!(config.max_parallel_networks, DEFAULT_MAX_PARALLEL_NETWORKS);
        config.validate().expect("valid");
    }
}
