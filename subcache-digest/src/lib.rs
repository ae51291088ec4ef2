//! # subcache-digest
//!
//! TTL-refreshed network and per-subscriber digest cache.
//!
//! Build a [`Renewer`] over a [`subcache_core::DirectoryClient`], a
//! [`RenewalStore`] and a [`Clock`], then call [`Renewer::renew`] once per
//! scheduler tick.

pub mod clock;
pub mod digest;
pub mod error;
pub mod reconcile;
pub mod renewal;
pub mod staleness;
pub mod store;

pub use clock::{Clock, MockClock, SystemClock};
pub use digest::{compute, hash_deterministic, NetworkDigests, SubscriberData};
pub use error::{
    ComputationError, NetworkError, NetworkFailure, Operation, RenewalError, RenewalFailures,
    StoreError,
};
pub use renewal::{renew_digests, RenewalReport, Renewer};
pub use staleness::StalenessSignal;
pub use store::{DigestStore, FileDigestStore, PerSubscriberDigestStore, RenewalStore};
