use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use subcache_core::{directory, DirectoryClient, FileDirectory, RenewalConfig};
use subcache_digest::{store, Clock, FileDigestStore, RenewalStore, Renewer, SystemClock};

use crate::error::{io_err, DaemonError};
use crate::paths::run_dir;
use crate::status::{write_status, DaemonStatus, PassSummary};

/// Start the scheduler and block the current thread until it exits.
pub fn start_blocking(home: &Path, config: RenewalConfig) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config))
}

/// Run the scheduler against the file directory and file digest store under
/// `home` until ctrl-c.
pub async fn run(home: PathBuf, config: RenewalConfig) -> Result<(), DaemonError> {
    config.validate()?;
    ensure_runtime_dirs(&home)?;

    let renewer = Arc::new(Renewer::new(
        config,
        FileDirectory::new(&home),
        FileDigestStore::at_home(&home),
        SystemClock,
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    tracing::info!(
        home = %home.display(),
        sleep_interval_secs = renewer.config().sleep_interval_secs,
        update_interval_secs = renewer.config().update_interval_secs,
        max_parallel_networks = renewer.config().max_parallel_networks,
        "starting subcache daemon",
    );

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let renewer = renewer.clone();
        tokio::spawn(async move {
            let result = scheduler_task(home, renewer, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err.to_string())),
                    }
                }
            }
        })
    };

    let (scheduler_result, signal_result) = tokio::join!(scheduler_handle, signal_handle);
    handle_join("scheduler", scheduler_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("subcache daemon stopped");
    Ok(())
}

/// Run one renewal pass on the blocking pool.
///
/// Cancelling `cancel`, or exceeding the configured pass timeout, defers every
/// network whose refresh has not started yet. Refreshes already in flight run
/// to completion, so this always waits for the pass to return.
pub async fn run_pass<D, S, C>(
    renewer: Arc<Renewer<D, S, C>>,
    cancel: CancellationToken,
) -> Result<PassSummary, DaemonError>
where
    D: DirectoryClient + 'static,
    S: RenewalStore + 'static,
    C: Clock + 'static,
{
    let started_at = Utc::now();
    let started = Instant::now();
    let pass_timeout = renewer.config().pass_timeout();

    let mut task = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || renewer.renew_with_cancel(&cancel))
    };

    let joined = match pass_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = limit.as_secs(),
                    "renewal pass timed out, deferring remaining networks",
                );
                cancel.cancel();
                task.await
            }
        },
        None => task.await,
    };
    let result = joined.map_err(|err| DaemonError::Join("renewal pass", err.to_string()))?;

    Ok(PassSummary::from_result(started_at, started.elapsed(), &result))
}

async fn scheduler_task<D, S, C>(
    home: PathBuf,
    renewer: Arc<Renewer<D, S, C>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError>
where
    D: DirectoryClient + 'static,
    S: RenewalStore + 'static,
    C: Clock + 'static,
{
    let mut status = DaemonStatus::starting(renewer.config());
    write_status(&home, &status)?;

    let mut interval = tokio::time::interval(renewer.config().sleep_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let cancel = CancellationToken::new();
                let pass = run_pass(renewer.clone(), cancel.clone());
                tokio::pin!(pass);

                let summary = tokio::select! {
                    summary = &mut pass => summary?,
                    _ = shutdown_rx.recv() => {
                        tracing::info!("shutdown requested, cancelling in-flight pass");
                        cancel.cancel();
                        let summary = pass.await?;
                        log_summary(&summary);
                        status.record(summary);
                        write_status(&home, &status)?;
                        break;
                    }
                };

                log_summary(&summary);
                status.record(summary);
                if let Err(err) = write_status(&home, &status) {
                    tracing::warn!(error = %err, "failed to write daemon status");
                }
            }
        }
    }

    Ok(())
}

fn log_summary(summary: &PassSummary) {
    if let Some(err) = &summary.error {
        tracing::error!(error = %err, "renewal pass could not start");
        return;
    }
    if summary.failed > 0 {
        let networks: Vec<&str> = summary.failed_networks.iter().map(|n| n.as_str()).collect();
        tracing::warn!(
            failed = summary.failed,
            networks = ?networks,
            "renewal pass finished with failures",
        );
    }
    tracing::info!(
        renewed = summary.renewed,
        deleted = summary.deleted,
        skipped = summary.skipped,
        deferred = summary.deferred,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "renewal pass complete",
    );
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [
        run_dir(home),
        directory::directory_root_at(home),
        store::digests_root_at(home),
    ] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join(task, err.to_string())),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
