//! Scheduler daemon: runs one renewal pass every `sleep_interval_secs` until
//! ctrl-c, recording the outcome of each pass in a status file.

mod error;
pub mod paths;
mod runtime;
pub mod status;

pub use error::DaemonError;
pub use runtime::{run, run_pass, start_blocking};
pub use status::{read_status, write_status, DaemonStatus, PassSummary};
