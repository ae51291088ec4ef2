//! `subcache renew`: run one renewal pass in the foreground.

use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use subcache_core::FileDirectory;
use subcache_digest::{FileDigestStore, RenewalReport, Renewer, SystemClock};

use super::Context;

#[derive(Args, Debug)]
pub struct RenewArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ReportJson {
    renewed: usize,
    deleted: usize,
    skipped: usize,
    deferred: usize,
    failed: usize,
    failures: Vec<FailureJson>,
}

#[derive(Serialize)]
struct FailureJson {
    network: String,
    operation: String,
    error: String,
}

impl RenewArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let config = ctx.config()?;
        let renewer = Renewer::new(
            config,
            FileDirectory::new(&ctx.home),
            FileDigestStore::at_home(&ctx.home),
            SystemClock,
        );

        let mut report = renewer.renew().context("renewal pass could not start")?;
        if self.json {
            print_json(&report)?;
        } else {
            print_summary(&report);
        }

        match report.failures.take() {
            Some(failures) => Err(anyhow!(failures)),
            None => Ok(()),
        }
    }
}

fn print_json(report: &RenewalReport) -> Result<()> {
    let payload = ReportJson {
        renewed: report.renewed,
        deleted: report.deleted,
        skipped: report.skipped,
        deferred: report.deferred,
        failed: report.failed(),
        failures: report
            .failures
            .iter()
            .flat_map(|f| f.0.iter())
            .map(|f| FailureJson {
                network: f.network.to_string(),
                operation: f.operation.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize renewal report")?
    );
    Ok(())
}

fn print_summary(report: &RenewalReport) {
    println!(
        "{} renewed, {} deleted, {} skipped, {} deferred, {} failed",
        report.renewed.to_string().green(),
        report.deleted.to_string().yellow(),
        report.skipped,
        report.deferred,
        report.failed().to_string().red(),
    );
    for failure in report.failures.iter().flat_map(|f| f.0.iter()) {
        println!("  {} {failure}", "✗".red());
    }
}
