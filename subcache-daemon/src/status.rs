//! Daemon status file at `<home>/.subcache/run/status.json`.
//!
//! Rewritten after every pass with the tmp + rename pattern so
//! `subcache daemon status` never reads a half-written document.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use subcache_core::{NetworkId, RenewalConfig};
use subcache_digest::{RenewalError, RenewalReport};

use crate::error::{io_err, DaemonError};
use crate::paths::{run_dir, status_path};

/// Outcome of one scheduled pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub renewed: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub deferred: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_networks: Vec<NetworkId>,
    /// Set when the pass could not start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PassSummary {
    pub fn from_result(
        started_at: DateTime<Utc>,
        elapsed: Duration,
        result: &Result<RenewalReport, RenewalError>,
    ) -> Self {
        let mut summary = Self {
            started_at,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            renewed: 0,
            deleted: 0,
            skipped: 0,
            deferred: 0,
            failed: 0,
            failed_networks: vec![],
            error: None,
        };
        match result {
            Ok(report) => {
                summary.renewed = report.renewed;
                summary.deleted = report.deleted;
                summary.skipped = report.skipped;
                summary.deferred = report.deferred;
                summary.failed = report.failed();
                if let Some(failures) = &report.failures {
                    summary.failed_networks = failures.networks().cloned().collect();
                }
            }
            Err(err) => summary.error = Some(err.to_string()),
        }
        summary
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub sleep_interval_secs: u64,
    pub update_interval_secs: u64,
    pub passes: u64,
    #[serde(default)]
    pub last_pass: Option<PassSummary>,
}

impl DaemonStatus {
    pub fn starting(config: &RenewalConfig) -> Self {
        Self {
            pid: std::process::id(),
            started_at: Utc::now(),
            sleep_interval_secs: config.sleep_interval_secs,
            update_interval_secs: config.update_interval_secs,
            passes: 0,
            last_pass: None,
        }
    }

    pub fn record(&mut self, summary: PassSummary) {
        self.passes += 1;
        self.last_pass = Some(summary);
    }
}

pub fn write_status(home: &Path, status: &DaemonStatus) -> Result<(), DaemonError> {
    let dir = run_dir(home);
    fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

    let path = status_path(home);
    let json = serde_json::to_string_pretty(status)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(err) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&path, err));
    }
    Ok(())
}

/// `Ok(None)` if no daemon has written a status yet.
pub fn read_status(home: &Path) -> Result<Option<DaemonStatus>, DaemonError> {
    let path = status_path(home);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(&path, err)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| DaemonError::StatusParse { path, source })
}
