//! Deterministic network and per-subscriber digests.
//!
//! Both levels are computed over canonical records: entities are sorted
//! before hashing and only the fields served to gateways are serialized, so
//! entity order, storage identifiers and directory timestamps never perturb a
//! digest.
//!
//! A subscriber digest is `hex(sha256(canonical JSON))` followed by
//! [`DIGEST_FORMAT_TAG`]. Consumers compare the 64-character hash prefix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use subcache_core::types::{AggregatedMaximumBitrate, QosProfile};
use subcache_core::{
    ApnConfiguration, Entity, NetworkId, SubscriberDigestEntry, SubscriberEntity, SubscriberId,
    SubscriptionState,
};

use crate::error::ComputationError;

/// Appended to every subscriber hash; identifies the canonical record layout.
pub const DIGEST_FORMAT_TAG: &str = "-v1";

/// Length of the hex-encoded SHA-256 prefix of every digest.
pub const HASH_HEX_LEN: usize = 64;

const IMSI_PREFIX: &str = "IMSI";
const DEFAULT_SUB_PROFILE: &str = "default";

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityType {
    #[serde(rename = "IMSI")]
    Imsi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberIdentity {
    pub id: SubscriberId,
    #[serde(rename = "type")]
    pub id_type: IdentityType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LteSubscriptionData {
    pub state: SubscriptionState,
    /// Lowercase hex; empty when no key is provisioned.
    pub auth_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnConfigData {
    pub service_selection: String,
    pub ambr: Option<AggregatedMaximumBitrate>,
    pub qos_profile: Option<QosProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Non3gppUserProfile {
    pub apn_config: Vec<ApnConfigData>,
}

/// The record served for one subscriber. Field order is part of the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberData {
    pub sid: SubscriberIdentity,
    pub lte: LteSubscriptionData,
    pub non_3gpp: Non3gppUserProfile,
    pub network_id: NetworkId,
    pub sub_profile: String,
}

#[derive(Serialize)]
struct NetworkContent<'a> {
    network_id: &'a NetworkId,
    apns: Vec<ApnConfigData>,
    subscribers: &'a [SubscriberData],
}

/// Output of [`compute`] for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDigests {
    pub network_digest: String,
    /// Ascending by subscriber ID.
    pub subscribers: Vec<SubscriberDigestEntry>,
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// SHA-256 (lowercase hex) of the canonical JSON encoding of `value`.
///
/// Deterministic as long as `value` contains no unordered maps.
pub fn hash_deterministic<T: Serialize + ?Sized>(value: &T) -> Result<String, ComputationError> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Full digest string for one subscriber record.
pub fn subscriber_digest(data: &SubscriberData) -> Result<String, ComputationError> {
    Ok(format!("{}{DIGEST_FORMAT_TAG}", hash_deterministic(data)?))
}

/// The hash prefix of a digest string, i.e. the part consumers compare.
pub fn digest_hash_prefix(digest: &str) -> &str {
    digest.get(..HASH_HEX_LEN).unwrap_or(digest)
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute the network digest and ordered subscriber digests of `network`.
pub fn compute(network: &NetworkId, entities: &[Entity]) -> Result<NetworkDigests, ComputationError> {
    let mut apns: BTreeMap<&str, &ApnConfiguration> = BTreeMap::new();
    let mut subscribers: Vec<&SubscriberEntity> = Vec::new();
    for entity in entities {
        match entity {
            Entity::Apn(apn) => {
                if apns.insert(apn.key.as_str(), &apn.config).is_some() {
                    return Err(ComputationError::DuplicateApn {
                        key: apn.key.clone(),
                    });
                }
            }
            Entity::Subscriber(sub) => subscribers.push(sub),
        }
    }

    let mut records = subscribers
        .into_iter()
        .map(|sub| subscriber_data(network, sub, &apns))
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(|a, b| a.sid.id.cmp(&b.sid.id));
    if let Some(pair) = records.windows(2).find(|w| w[0].sid.id == w[1].sid.id) {
        return Err(ComputationError::DuplicateSubscriber {
            key: format!("{IMSI_PREFIX}{}", pair[0].sid.id),
        });
    }

    let entries = records
        .iter()
        .map(|data| {
            Ok(SubscriberDigestEntry {
                subscriber_id: data.sid.id.clone(),
                digest: subscriber_digest(data)?,
            })
        })
        .collect::<Result<Vec<_>, ComputationError>>()?;

    let content = NetworkContent {
        network_id: network,
        apns: apns
            .iter()
            .map(|(name, config)| apn_config_data(name, config))
            .collect(),
        subscribers: &records,
    };

    Ok(NetworkDigests {
        network_digest: hash_deterministic(&content)?,
        subscribers: entries,
    })
}

/// Build the canonical record for one subscriber of `network`.
pub fn subscriber_data(
    network: &NetworkId,
    sub: &SubscriberEntity,
    apns: &BTreeMap<&str, &ApnConfiguration>,
) -> Result<SubscriberData, ComputationError> {
    let id = parse_imsi(&sub.key)?;

    let (state, auth_key, sub_profile) = match &sub.config.lte {
        Some(lte) => {
            let auth_key = canonical_hex(&sub.key, "auth_key", &lte.auth_key)?;
            canonical_hex(&sub.key, "auth_opc", &lte.auth_opc)?;
            (lte.state, auth_key, lte.sub_profile.clone())
        }
        None => (SubscriptionState::Inactive, String::new(), None),
    };

    let mut apn_names: Vec<&str> = sub.config.active_apns.iter().map(String::as_str).collect();
    apn_names.sort_unstable();
    apn_names.dedup();
    let apn_config = apn_names
        .into_iter()
        .map(|name| match apns.get(name) {
            Some(config) => Ok(apn_config_data(name, config)),
            None => Err(ComputationError::UnknownApn {
                subscriber: sub.key.clone(),
                apn: name.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SubscriberData {
        sid: SubscriberIdentity {
            id,
            id_type: IdentityType::Imsi,
        },
        lte: LteSubscriptionData { state, auth_key },
        non_3gpp: Non3gppUserProfile { apn_config },
        network_id: network.clone(),
        sub_profile: sub_profile
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_SUB_PROFILE.to_string()),
    })
}

fn apn_config_data(name: &str, config: &ApnConfiguration) -> ApnConfigData {
    ApnConfigData {
        service_selection: name.to_string(),
        ambr: config.ambr.clone(),
        qos_profile: config.qos_profile.clone(),
    }
}

fn parse_imsi(key: &str) -> Result<SubscriberId, ComputationError> {
    match key.strip_prefix(IMSI_PREFIX) {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(SubscriberId::from(digits))
        }
        _ => Err(ComputationError::InvalidSubscriberKey {
            key: key.to_string(),
        }),
    }
}

fn canonical_hex(subscriber: &str, field: &'static str, value: &str) -> Result<String, ComputationError> {
    let bytes = hex::decode(value).map_err(|source| ComputationError::InvalidHex {
        subscriber: subscriber.to_string(),
        field,
        source,
    })?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use subcache_core::{ApnEntity, LteSubscription, SubscriberConfig};

    fn n1() -> NetworkId {
        NetworkId::from("n1")
    }

    fn active(key: &str) -> Entity {
        Entity::Subscriber(SubscriberEntity {
            key: key.to_string(),
            pk: None,
            config: SubscriberConfig {
                lte: Some(LteSubscription {
                    state: SubscriptionState::Active,
                    ..Default::default()
                }),
                active_apns: vec![],
            },
        })
    }

    fn with_apns(key: &str, apns: &[&str]) -> Entity {
        let mut entity = active(key);
        if let Entity::Subscriber(sub) = &mut entity {
            sub.config.active_apns = apns.iter().map(|s| s.to_string()).collect();
        }
        entity
    }

    fn apn(key: &str, class_id: i32) -> Entity {
        Entity::Apn(ApnEntity {
            key: key.to_string(),
            pk: None,
            config: ApnConfiguration {
                ambr: None,
                qos_profile: Some(QosProfile {
                    class_id,
                    priority_level: 1,
                    ..Default::default()
                }),
            },
        })
    }

    #[test]
    fn empty_network_has_defined_digest() {
        let out = compute(&n1(), &[]).expect("compute");
        assert_eq!(out.network_digest.len(), HASH_HEX_LEN);
        assert!(out.subscribers.is_empty());

        let other = compute(&NetworkId::from("n2"), &[]).expect("compute");
        assert_ne!(out.network_digest, other.network_digest);
    }

    #[test]
    fn digests_ignore_input_order() {
        let forward = vec![apn("apn1", 9), active("IMSI99999"), active("IMSI11111")];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = compute(&n1(), &forward).expect("compute");
        let b = compute(&n1(), &reversed).expect("compute");
        assert_eq!(a, b);
    }

    #[test]
    fn subscribers_sorted_ascending() {
        let out = compute(
            &n1(),
            &[active("IMSI300"), active("IMSI1"), active("IMSI20")],
        )
        .expect("compute");
        let ids: Vec<_> = out.subscribers.iter().map(|e| e.subscriber_id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "20", "300"]);
    }

    #[test]
    fn subscriber_digest_is_hash_prefix_plus_tag() {
        let out = compute(&n1(), &[active("IMSI11111")]).expect("compute");
        let expected = SubscriberData {
            sid: SubscriberIdentity {
                id: SubscriberId::from("11111"),
                id_type: IdentityType::Imsi,
            },
            lte: LteSubscriptionData {
                state: SubscriptionState::Active,
                auth_key: String::new(),
            },
            non_3gpp: Non3gppUserProfile { apn_config: vec![] },
            network_id: n1(),
            sub_profile: "default".to_string(),
        };
        let hash = hash_deterministic(&expected).expect("hash");
        let digest = &out.subscribers[0].digest;
        assert!(digest.starts_with(&hash));
        assert_eq!(digest_hash_prefix(digest), hash);
        assert!(digest.ends_with(DIGEST_FORMAT_TAG));
    }

    #[test]
    fn state_change_changes_subscriber_and_network_digest_only() {
        let before = compute(&n1(), &[active("IMSI1"), active("IMSI2")]).expect("compute");
        let mut flipped = active("IMSI2");
        if let Entity::Subscriber(sub) = &mut flipped {
            sub.config.lte.as_mut().unwrap().state = SubscriptionState::Inactive;
        }
        let after = compute(&n1(), &[active("IMSI1"), flipped]).expect("compute");

        assert_ne!(before.network_digest, after.network_digest);
        assert_eq!(before.subscribers[0], after.subscribers[0]);
        assert_ne!(before.subscribers[1].digest, after.subscribers[1].digest);
    }

    #[test]
    fn identical_subscriber_differs_across_networks() {
        let a = compute(&n1(), &[active("IMSI1")]).expect("compute");
        let b = compute(&NetworkId::from("n2"), &[active("IMSI1")]).expect("compute");
        assert_ne!(a.subscribers[0].digest, b.subscribers[0].digest);
    }

    #[test]
    fn storage_identifiers_do_not_affect_digests() {
        let mut with_pk = active("IMSI1");
        if let Entity::Subscriber(sub) = &mut with_pk {
            sub.pk = Some(1234);
        }
        let a = compute(&n1(), &[active("IMSI1")]).expect("compute");
        let b = compute(&n1(), &[with_pk]).expect("compute");
        assert_eq!(a, b);
    }

    #[test]
    fn apn_change_reaches_referencing_subscribers_only() {
        let before = compute(
            &n1(),
            &[apn("internet", 9), with_apns("IMSI1", &["internet"]), active("IMSI2")],
        )
        .expect("compute");
        let after = compute(
            &n1(),
            &[apn("internet", 5), with_apns("IMSI1", &["internet"]), active("IMSI2")],
        )
        .expect("compute");

        assert_ne!(before.network_digest, after.network_digest);
        assert_ne!(before.subscribers[0].digest, after.subscribers[0].digest);
        assert_eq!(before.subscribers[1].digest, after.subscribers[1].digest);
    }

    #[test]
    fn unreferenced_apn_still_changes_network_digest() {
        let without = compute(&n1(), &[active("IMSI1")]).expect("compute");
        let with = compute(&n1(), &[apn("apn1", 9), active("IMSI1")]).expect("compute");
        assert_ne!(without.network_digest, with.network_digest);
        assert_eq!(without.subscribers, with.subscribers);
    }

    #[test]
    fn auth_key_hex_case_is_canonicalized() {
        let keyed = |key: &str| {
            Entity::Subscriber(SubscriberEntity {
                key: "IMSI1".into(),
                pk: None,
                config: SubscriberConfig {
                    lte: Some(LteSubscription {
                        state: SubscriptionState::Active,
                        auth_key: key.to_string(),
                        ..Default::default()
                    }),
                    active_apns: vec![],
                },
            })
        };
        let upper = compute(&n1(), &[keyed("AABBCC")]).expect("compute");
        let lower = compute(&n1(), &[keyed("aabbcc")]).expect("compute");
        assert_eq!(upper, lower);
    }

    #[test]
    fn malformed_entities_are_computation_errors() {
        let err = compute(&n1(), &[active("11111")]).unwrap_err();
        assert!(matches!(err, ComputationError::InvalidSubscriberKey { .. }));

        let err = compute(&n1(), &[active("IMSI1"), active("IMSI1")]).unwrap_err();
        assert!(matches!(err, ComputationError::DuplicateSubscriber { .. }));

        let err = compute(&n1(), &[apn("a", 1), apn("a", 2)]).unwrap_err();
        assert!(matches!(err, ComputationError::DuplicateApn { .. }));

        let err = compute(&n1(), &[with_apns("IMSI1", &["missing"])]).unwrap_err();
        assert!(err.to_string().contains("missing"), "got: {err}");

        let mut bad_key = active("IMSI1");
        if let Entity::Subscriber(sub) = &mut bad_key {
            sub.config.lte.as_mut().unwrap().auth_key = "zz".into();
        }
        let err = compute(&n1(), &[bad_key]).unwrap_err();
        assert!(matches!(err, ComputationError::InvalidHex { field: "auth_key", .. }));
    }
}
