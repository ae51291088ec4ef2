//! Directory error-message, atomic-write-safety, and round-trip tests.
//! Storage: ~/.subcache/directory/<network>.yaml

use assert_fs::prelude::*;
use chrono::Utc;
use predicates::prelude::predicate;
use std::fs;
use subcache_core::{
    directory::{self, DirectoryClient, FileDirectory},
    DirectoryError, Entity, LteSubscription, Network, NetworkId, SubscriberConfig,
    SubscriberEntity, SubscriptionState,
};

fn n1() -> NetworkId { NetworkId::from("n1") }

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_network_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = directory::load_network_at(home.path(), &n1()).unwrap_err();
    assert!(matches!(err, DirectoryError::NetworkNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("'n1'"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".subcache/directory/n1.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = directory::load_network_at(home.path(), &n1()).unwrap_err();
    assert!(matches!(err, DirectoryError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("n1.yaml"), "must contain file path, got: {err}");
}

#[test]
fn unknown_entity_type_is_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let now = Utc::now().to_rfc3339();
    home.child(".subcache/directory/n1.yaml")
        .write_str(&format!(
            "id: n1\ncreated_at: {now}\nupdated_at: {now}\nentities:\n  - type: gateway\n    key: g1\n"
        ))
        .expect("write");

    let directory = FileDirectory::new(home.path());
    let err = directory.get_entities(&n1()).unwrap_err();
    assert!(matches!(err, DirectoryError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_cleans_up_tmp_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    directory::create_network_at(home.path(), n1(), None).expect("create");

    home.child(".subcache/directory/n1.yaml")
        .assert(predicate::path::exists());
    home.child(".subcache/directory/n1.yaml.tmp")
        .assert(predicate::path::missing());
}

#[test]
fn leftover_tmp_is_not_listed_as_network() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    directory::create_network_at(home.path(), n1(), None).expect("create");

    // Simulate crash: .tmp written but process died before rename
    home.child(".subcache/directory/n2.yaml.tmp")
        .write_str("CRASH - INCOMPLETE WRITE")
        .expect("write crash tmp");

    let ids: Vec<_> = directory::list_network_ids_at(home.path())
        .expect("list")
        .into_iter()
        .collect();
    assert_eq!(ids, vec![n1()]);
}

#[test]
fn delete_removes_document() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    directory::create_network_at(home.path(), n1(), None).expect("create");

    assert!(directory::delete_network_at(home.path(), &n1()).expect("delete"));
    assert!(!directory::delete_network_at(home.path(), &n1()).expect("delete again"));
    home.child(".subcache/directory/n1.yaml")
        .assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// 3. Round trip
// ---------------------------------------------------------------------------

#[test]
fn entities_survive_save_and_load() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    directory::create_network_at(home.path(), n1(), Some("tenant one".into())).expect("create");
    let sub = Entity::Subscriber(SubscriberEntity {
        key: "IMSI11111".into(),
        pk: Some(42),
        config: SubscriberConfig {
            lte: Some(LteSubscription {
                state: SubscriptionState::Active,
                auth_key: "00112233".into(),
                ..Default::default()
            }),
            active_apns: vec!["internet".into()],
        },
    });
    directory::upsert_entities_at(home.path(), &n1(), vec![sub.clone()]).expect("upsert");

    let loaded: Network = directory::load_network_at(home.path(), &n1()).expect("load");
    assert_eq!(loaded.name.as_deref(), Some("tenant one"));
    assert_eq!(loaded.entities, vec![sub]);

    let yaml = fs::read_to_string(directory::network_path_at(home.path(), &n1())).expect("read");
    assert!(yaml.contains("type: subscriber"), "tagged entity yaml, got:\n{yaml}");
}
