use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the scheduler runtime and its status file.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] subcache_core::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("status file {path} is malformed: {source}")]
    StatusParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} task join failure: {1}")]
    Join(&'static str, String),

    #[error("signal handler failed: {0}")]
    Signal(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
