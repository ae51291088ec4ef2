//! subcache core library: domain types, upstream directory, configuration.
//!
//! - [`types`]: newtypes, entity model and digest records
//! - [`directory`]: [`DirectoryClient`] and the YAML-backed [`FileDirectory`]
//! - [`config`]: [`RenewalConfig`] load / validate
//! - [`error`]: [`DirectoryError`], [`ConfigError`]

pub mod config;
pub mod directory;
pub mod error;
pub mod types;

pub use config::RenewalConfig;
pub use directory::{DirectoryClient, FileDirectory};
pub use error::{ConfigError, DirectoryError};
pub use types::{
    ApnConfiguration, ApnEntity, Entity, EntityKind, LteSubscription, Network,
    NetworkDigestRecord, NetworkId, PerSubscriberDigestRecord, SubscriberConfig,
    SubscriberDigestEntry, SubscriberEntity, SubscriberId, SubscriptionState,
};
