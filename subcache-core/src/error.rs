//! Error types for subcache-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::NetworkId;

/// All errors that can arise from directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Underlying I/O failure (permission denied, unreadable directory, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending document path.
    #[error("failed to parse network document at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The network is not (or no longer) present in the directory.
    #[error("network '{network}' not found in directory")]
    NetworkNotFound { network: NetworkId },

    #[error("invalid network id '{network}'")]
    InvalidNetworkId { network: NetworkId },
}

/// Errors from loading or validating [`crate::config::RenewalConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DirectoryError {
    DirectoryError::Io {
        path: path.into(),
        source,
    }
}
