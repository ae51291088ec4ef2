//! Domain types shared by the directory, the digest engine and the CLI.
//!
//! Upstream entities (networks, subscribers, APN configurations) are
//! serializable via serde + serde_yaml; digest records via serde_json in the
//! digest store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed tenant network identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub String);

impl NetworkId {
    /// Whether the ID can be used as a file stem by the file-backed stores.
    ///
    /// Rejects empty IDs, dot-prefixed IDs and IDs containing path separators
    /// or NUL bytes.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && !self.0.starts_with('.')
            && !self.0.contains(['/', '\\', '\0'])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for NetworkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NetworkId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A subscriber identity, unique within its network (e.g. `"11111"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SubscriberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubscriberId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// LTE subscription state of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionState {
    #[default]
    Inactive,
    Active,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Inactive => write!(f, "INACTIVE"),
            SubscriptionState::Active => write!(f, "ACTIVE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity configuration
// ---------------------------------------------------------------------------

/// LTE block of a subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LteSubscription {
    pub state: SubscriptionState,
    /// Hex-encoded authentication key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_key: String,
    /// Hex-encoded operator key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_opc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_profile: Option<String>,
}

/// Configuration of a subscriber entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SubscriberConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<LteSubscription>,
    /// Names of the APN entities this subscriber may attach to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_apns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AggregatedMaximumBitrate {
    pub max_bandwidth_ul: u32,
    pub max_bandwidth_dl: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QosProfile {
    pub class_id: i32,
    pub priority_level: u32,
    #[serde(default)]
    pub preemption_capability: bool,
    #[serde(default)]
    pub preemption_vulnerability: bool,
}

/// Configuration of an access point name. Influences the data served for
/// every subscriber that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ApnConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambr: Option<AggregatedMaximumBitrate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos_profile: Option<QosProfile>,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A subscriber entity as stored upstream. `key` is `IMSI<digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberEntity {
    pub key: String,
    /// Internal storage identifier; never part of any digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<u64>,
    #[serde(default)]
    pub config: SubscriberConfig,
}

/// An APN entity as stored upstream. `key` is the APN name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnEntity {
    pub key: String,
    /// Internal storage identifier; never part of any digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<u64>,
    #[serde(default)]
    pub config: ApnConfiguration,
}

/// Any entity belonging to a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Subscriber(SubscriberEntity),
    Apn(ApnEntity),
}

impl Entity {
    pub fn key(&self) -> &str {
        match self {
            Entity::Subscriber(sub) => &sub.key,
            Entity::Apn(apn) => &apn.key,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Subscriber(_) => EntityKind::Subscriber,
            Entity::Apn(_) => EntityKind::Apn,
        }
    }
}

/// Discriminant of [`Entity`], used to address entities by `(kind, key)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Subscriber,
    Apn,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Subscriber => write!(f, "subscriber"),
            EntityKind::Apn => write!(f, "apn"),
        }
    }
}

/// A tenant network document as kept by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

// ---------------------------------------------------------------------------
// Digest records
// ---------------------------------------------------------------------------

/// Aggregate digest of one network plus the time it was computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDigestRecord {
    pub network_id: NetworkId,
    pub digest: String,
    pub last_renewed_at: DateTime<Utc>,
}

/// Digest of a single subscriber. The leading 64 hex characters are the
/// SHA-256 of the subscriber's canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberDigestEntry {
    pub subscriber_id: SubscriberId,
    pub digest: String,
}

/// All subscriber digests of one network, ascending by subscriber ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSubscriberDigestRecord {
    pub network_id: NetworkId,
    #[serde(default)]
    pub entries: Vec<SubscriberDigestEntry>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
