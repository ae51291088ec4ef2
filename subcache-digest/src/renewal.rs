//! Renewal orchestration: one pass over every network.
//!
//! ## Pass protocol
//!
//! 1. Validate the config, then list cached networks (store) and live
//!    networks (directory). Any failure aborts the pass before anything is
//!    touched.
//! 2. Reconcile into `new`, `removed` and `existing`.
//! 3. Remove both records of every `removed` network.
//! 4. Gate every `existing` network on `last_renewed_at`; `new` networks are
//!    always due.
//! 5. Refresh due networks on up to `max_parallel_networks` worker threads:
//!    fetch entities, compute digests, commit both records as one unit.
//! 6. Report counts plus the aggregated per-network failures.
//!
//! Per-network failures never stop the pass. Nothing is retried here: a
//! failed network keeps its old `last_renewed_at` and is due again next pass.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use subcache_core::{
    DirectoryClient, NetworkDigestRecord, NetworkId, PerSubscriberDigestRecord, RenewalConfig,
};

use crate::clock::Clock;
use crate::digest;
use crate::error::{NetworkError, NetworkFailure, Operation, RenewalError, RenewalFailures};
use crate::reconcile::reconcile;
use crate::staleness;
use crate::store::RenewalStore;

/// Outcome of one renewal pass that got past reconciliation.
#[derive(Debug, Default)]
pub struct RenewalReport {
    /// Networks whose records were recomputed and committed.
    pub renewed: usize,
    /// Removed networks whose records were actually deleted this pass.
    pub deleted: usize,
    /// Existing networks still within the update interval.
    pub skipped: usize,
    /// Due networks left for the next pass because the pass was cancelled.
    pub deferred: usize,
    /// `Some` iff at least one per-network operation failed.
    pub failures: Option<RenewalFailures>,
}

impl RenewalReport {
    pub fn failed(&self) -> usize {
        self.failures.as_ref().map_or(0, RenewalFailures::len)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_none()
    }
}

/// Owns the collaborators of the renewal engine and serializes passes.
pub struct Renewer<D, S, C> {
    config: RenewalConfig,
    directory: D,
    store: S,
    clock: C,
    pass_lock: Mutex<()>,
}

impl<D, S, C> Renewer<D, S, C>
where
    D: DirectoryClient,
    S: RenewalStore,
    C: Clock,
{
    pub fn new(config: RenewalConfig, directory: D, store: S, clock: C) -> Self {
        Self {
            config,
            directory,
            store,
            clock,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RenewalConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one pass. Blocks while another pass on this renewer is in flight.
    pub fn renew(&self) -> Result<RenewalReport, RenewalError> {
        self.renew_with_cancel(&CancellationToken::new())
    }

    /// Run one pass; networks not started before `cancel` fires are deferred.
    pub fn renew_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RenewalReport, RenewalError> {
        let _pass = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);
        Pass {
            config: &self.config,
            directory: &self.directory,
            store: &self.store,
            clock: &self.clock,
        }
        .run(cancel)
    }
}

/// Run one pass over borrowed collaborators.
///
/// Unlike [`Renewer::renew`], concurrent calls are not serialized.
pub fn renew_digests<D, S, C>(
    config: &RenewalConfig,
    directory: &D,
    store: &S,
    clock: &C,
) -> Result<RenewalReport, RenewalError>
where
    D: DirectoryClient + ?Sized,
    S: RenewalStore + ?Sized,
    C: Clock + ?Sized,
{
    Pass {
        config,
        directory,
        store,
        clock,
    }
    .run(&CancellationToken::new())
}

struct Pass<'a, D: ?Sized, S: ?Sized, C: ?Sized> {
    config: &'a RenewalConfig,
    directory: &'a D,
    store: &'a S,
    clock: &'a C,
}

enum RefreshOutcome {
    Renewed,
    Deferred,
    Failed(NetworkFailure),
}

impl<D, S, C> Pass<'_, D, S, C>
where
    D: DirectoryClient + ?Sized,
    S: RenewalStore + ?Sized,
    C: Clock + ?Sized,
{
    fn run(&self, cancel: &CancellationToken) -> Result<RenewalReport, RenewalError> {
        self.config.validate().map_err(RenewalError::InvalidConfig)?;
        let now = self.clock.now();
        let cached = self.store.list_networks().map_err(RenewalError::ListCached)?;
        let live = self.directory.list_networks().map_err(RenewalError::ListLive)?;
        let plan = reconcile(&live, &cached);

        let mut report = RenewalReport::default();
        let mut failures = Vec::new();

        for network in &plan.removed {
            match self.store.remove(network) {
                Ok(true) => {
                    report.deleted += 1;
                    tracing::info!("removed digests of deleted network {network}");
                }
                Ok(false) => tracing::debug!("digests of deleted network {network} already gone"),
                Err(err) => failures.push(failure(network, Operation::Remove, err.into())),
            }
        }

        let interval = self.config.update_interval();
        let mut due: Vec<NetworkId> = plan.new.into_iter().collect();
        for network in plan.existing {
            let last_renewed_at = match self.store.get_digest(&network) {
                Ok(record) => record.map(|r| r.last_renewed_at),
                Err(err) => {
                    failures.push(failure(&network, Operation::Refresh, err.into()));
                    continue;
                }
            };
            let signal = staleness::check(last_renewed_at, now, interval);
            if signal.is_due() {
                due.push(network);
            } else {
                report.skipped += 1;
                tracing::debug!("skipping network {network}: {}", signal.label());
            }
        }
        due.sort();

        for outcome in self.refresh_all(due, now, cancel) {
            match outcome {
                RefreshOutcome::Renewed => report.renewed += 1,
                RefreshOutcome::Deferred => report.deferred += 1,
                RefreshOutcome::Failed(f) => failures.push(f),
            }
        }

        for f in &failures {
            tracing::warn!("network {} failed to {}: {}", f.network, f.operation, f.error);
        }
        if !failures.is_empty() {
            failures.sort_by(|a, b| a.network.cmp(&b.network));
            report.failures = Some(RenewalFailures(failures));
        }

        tracing::info!(
            "renewal pass: {} renewed, {} deleted, {} skipped, {} deferred, {} failed",
            report.renewed,
            report.deleted,
            report.skipped,
            report.deferred,
            report.failed(),
        );
        Ok(report)
    }

    fn refresh_all(
        &self,
        due: Vec<NetworkId>,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Vec<RefreshOutcome> {
        if due.is_empty() {
            return Vec::new();
        }
        let workers = self.config.max_parallel_networks.clamp(1, due.len());
        let queue = Mutex::new(due.into_iter());
        let outcomes = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                    let Some(network) = next else { break };
                    let outcome = if cancel.is_cancelled() {
                        tracing::debug!("deferring network {network}: pass cancelled");
                        RefreshOutcome::Deferred
                    } else {
                        match self.refresh(&network, now) {
                            Ok(()) => RefreshOutcome::Renewed,
                            Err(err) => {
                                RefreshOutcome::Failed(failure(&network, Operation::Refresh, err))
                            }
                        }
                    };
                    outcomes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(outcome);
                });
            }
        });

        outcomes.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self, network: &NetworkId, now: DateTime<Utc>) -> Result<(), NetworkError> {
        let entities = self.directory.get_entities(network)?;
        let digests = digest::compute(network, &entities)?;
        let subscriber_count = digests.subscribers.len();

        let record = NetworkDigestRecord {
            network_id: network.clone(),
            digest: digests.network_digest,
            last_renewed_at: now,
        };
        let subscribers = PerSubscriberDigestRecord {
            network_id: network.clone(),
            entries: digests.subscribers,
        };
        self.store.commit(&record, &subscribers)?;

        tracing::info!("renewed network {network}: {subscriber_count} subscriber digest(s)");
        Ok(())
    }
}

fn failure(network: &NetworkId, operation: Operation, error: NetworkError) -> NetworkFailure {
    NetworkFailure {
        network: network.clone(),
        operation,
        error,
    }
}
