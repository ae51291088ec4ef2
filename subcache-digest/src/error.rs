//! Error types for subcache-digest.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use subcache_core::{ConfigError, DirectoryError, NetworkId};

/// Entity data that cannot be turned into a canonical subscriber record.
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("subscriber key '{key}' is not of the form IMSI<digits>")]
    InvalidSubscriberKey { key: String },

    #[error("duplicate subscriber '{key}'")]
    DuplicateSubscriber { key: String },

    #[error("duplicate apn '{key}'")]
    DuplicateApn { key: String },

    #[error("subscriber '{subscriber}' references unknown apn '{apn}'")]
    UnknownApn { subscriber: String, apn: String },

    #[error("subscriber '{subscriber}' has invalid {field}: {source}")]
    InvalidHex {
        subscriber: String,
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("canonical serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Digest store read/write failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse digest document at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("digest store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid network id '{network}'")]
    InvalidNetworkId { network: NetworkId },

    #[error("record network '{record}' does not match subscriber record network '{subscribers}'")]
    MismatchedRecords {
        record: NetworkId,
        subscribers: NetworkId,
    },
}

/// Anything that can fail for a single network within a pass.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("directory: {0}")]
    Directory(#[from] DirectoryError),

    #[error("computation: {0}")]
    Computation(#[from] ComputationError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Which per-network step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Refresh,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Refresh => write!(f, "refresh"),
            Operation::Remove => write!(f, "remove"),
        }
    }
}

/// One network that could not be refreshed or removed.
#[derive(Debug, Error)]
#[error("{network} ({operation}): {error}")]
pub struct NetworkFailure {
    pub network: NetworkId,
    pub operation: Operation,
    #[source]
    pub error: NetworkError,
}

/// Aggregated per-network failures of one pass, ordered by network ID.
#[derive(Debug)]
pub struct RenewalFailures(pub Vec<NetworkFailure>);

impl RenewalFailures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkId> {
        self.0.iter().map(|f| &f.network)
    }
}

impl fmt::Display for RenewalFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} network(s) failed", self.0.len())?;
        for (i, failure) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RenewalFailures {}

/// The pass could not start: bad config, or a network listing failed.
#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("failed to list cached networks: {0}")]
    ListCached(#[source] StoreError),

    #[error("failed to list live networks: {0}")]
    ListLive(#[source] DirectoryError),

    #[error("invalid renewal config: {0}")]
    InvalidConfig(#[source] ConfigError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
