//! Upstream entity directory.
//!
//! [`DirectoryClient`] is the read-only view the renewal engine consumes.
//! [`FileDirectory`] implements it over one YAML document per network.
//!
//! # Storage layout
//!
//! ```text
//! ~/.subcache/
//!   directory/              (mode 0700)
//!     <network_id>.yaml     (one document per network: mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function takes an explicit `home: &Path` (`fn_at` form) so tests can
//! run against a `TempDir`. [`FileDirectory::from_home_dir`] resolves the real
//! home via `dirs::home_dir()`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{io_err, DirectoryError};
use crate::types::{Entity, EntityKind, Network, NetworkId};

/// Read-only view of upstream truth.
pub trait DirectoryClient: Send + Sync {
    /// All live network IDs.
    fn list_networks(&self) -> Result<BTreeSet<NetworkId>, DirectoryError>;

    /// Every entity of `network`, in storage order.
    ///
    /// Fails with [`DirectoryError::NetworkNotFound`] if the network is unknown.
    fn get_entities(&self, network: &NetworkId) -> Result<Vec<Entity>, DirectoryError>;
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.subcache/directory/`
pub fn directory_root_at(home: &Path) -> PathBuf {
    home.join(".subcache").join("directory")
}

/// `<home>/.subcache/directory/<network>.yaml`: pure, no I/O.
pub fn network_path_at(home: &Path, network: &NetworkId) -> PathBuf {
    directory_root_at(home).join(format!("{}.yaml", network.0))
}

fn ensure_valid(network: &NetworkId) -> Result<(), DirectoryError> {
    if network.is_valid() {
        Ok(())
    } else {
        Err(DirectoryError::InvalidNetworkId {
            network: network.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// 2. Load / list
// ---------------------------------------------------------------------------

/// IDs of every network document under the directory root, ascending.
///
/// Leftover `.yaml.tmp` files and dot-files are ignored.
pub fn list_network_ids_at(home: &Path) -> Result<BTreeSet<NetworkId>, DirectoryError> {
    let dir = directory_root_at(home);
    if !dir.exists() {
        return Ok(BTreeSet::new());
    }
    let mut ids = BTreeSet::new();
    for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        let id = NetworkId::from(stem.to_string_lossy().into_owned());
        if id.is_valid() {
            ids.insert(id);
        }
    }
    Ok(ids)
}

/// Load a network document.
///
/// Returns `NetworkNotFound` if absent, `Parse` (with path) if malformed.
pub fn load_network_at(home: &Path, network: &NetworkId) -> Result<Network, DirectoryError> {
    ensure_valid(network)?;
    let path = network_path_at(home, network);
    if !path.exists() {
        return Err(DirectoryError::NetworkNotFound {
            network: network.clone(),
        });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| DirectoryError::Parse { path, source })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a network document.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_network_at(home: &Path, network: &Network) -> Result<(), DirectoryError> {
    ensure_valid(&network.id)?;
    let dir = directory_root_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = network_path_at(home, &network.id);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", network.id.0));

    let yaml = serde_yaml::to_string(network)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Mutations
// ---------------------------------------------------------------------------

/// Create an empty network document.
///
/// Idempotent: if the network already exists, loads and returns it unchanged.
pub fn create_network_at(
    home: &Path,
    network: NetworkId,
    name: Option<String>,
) -> Result<Network, DirectoryError> {
    ensure_valid(&network)?;
    if network_path_at(home, &network).exists() {
        return load_network_at(home, &network);
    }
    let now = Utc::now();
    let doc = Network {
        id: network,
        name,
        created_at: now,
        updated_at: now,
        entities: vec![],
    };
    save_network_at(home, &doc)?;
    Ok(doc)
}

/// Remove a network document. Returns `false` if it did not exist.
pub fn delete_network_at(home: &Path, network: &NetworkId) -> Result<bool, DirectoryError> {
    ensure_valid(network)?;
    let path = network_path_at(home, network);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(&path, err)),
    }
}

/// Insert or replace entities of an existing network, matched by `(kind, key)`.
pub fn upsert_entities_at(
    home: &Path,
    network: &NetworkId,
    entities: Vec<Entity>,
) -> Result<Network, DirectoryError> {
    let mut doc = load_network_at(home, network)?;
    for entity in entities {
        let slot = doc
            .entities
            .iter_mut()
            .find(|e| e.kind() == entity.kind() && e.key() == entity.key());
        match slot {
            Some(existing) => *existing = entity,
            None => doc.entities.push(entity),
        }
    }
    doc.updated_at = Utc::now();
    save_network_at(home, &doc)?;
    Ok(doc)
}

/// Remove one entity. Returns `false` if no entity matched.
pub fn remove_entity_at(
    home: &Path,
    network: &NetworkId,
    kind: EntityKind,
    key: &str,
) -> Result<bool, DirectoryError> {
    let mut doc = load_network_at(home, network)?;
    let before = doc.entities.len();
    doc.entities.retain(|e| !(e.kind() == kind && e.key() == key));
    if doc.entities.len() == before {
        return Ok(false);
    }
    doc.updated_at = Utc::now();
    save_network_at(home, &doc)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// 5. DirectoryClient implementation
// ---------------------------------------------------------------------------

/// [`DirectoryClient`] over the YAML documents under `<home>/.subcache/directory/`.
#[derive(Debug, Clone)]
pub struct FileDirectory {
    home: PathBuf,
}

impl FileDirectory {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn from_home_dir() -> Result<Self, DirectoryError> {
        Ok(Self::new(home()?))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

impl DirectoryClient for FileDirectory {
    fn list_networks(&self) -> Result<BTreeSet<NetworkId>, DirectoryError> {
        list_network_ids_at(&self.home)
    }

    fn get_entities(&self, network: &NetworkId) -> Result<Vec<Entity>, DirectoryError> {
        Ok(load_network_at(&self.home, network)?.entities)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, DirectoryError> {
    dirs::home_dir().ok_or(DirectoryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), DirectoryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), DirectoryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), DirectoryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), DirectoryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApnEntity, SubscriberConfig, SubscriberEntity};
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    fn n1() -> NetworkId {
        NetworkId::from("n1")
    }

    fn subscriber(key: &str) -> Entity {
        Entity::Subscriber(SubscriberEntity {
            key: key.to_string(),
            pk: None,
            config: SubscriberConfig::default(),
        })
    }

    #[test]
    fn network_path_is_correct() {
        let home = make_home();
        let path = network_path_at(home.path(), &n1());
        assert!(path.ends_with(".subcache/directory/n1.yaml"));
    }

    #[test]
    fn list_empty_when_root_missing() {
        let home = make_home();
        assert!(list_network_ids_at(home.path()).expect("list").is_empty());
    }

    #[test]
    fn create_is_idempotent() {
        let home = make_home();
        let first = create_network_at(home.path(), n1(), Some("first".into())).expect("create");
        let second = create_network_at(home.path(), n1(), None).expect("create again");
        assert_eq!(first, second);
        assert_eq!(second.name.as_deref(), Some("first"));
    }

    #[test]
    fn root_dir_created_with_perms() {
        let home = make_home();
        create_network_at(home.path(), n1(), None).expect("create");
        let dir = directory_root_at(home.path());
        assert!(dir.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn upsert_replaces_by_kind_and_key() {
        let home = make_home();
        create_network_at(home.path(), n1(), None).expect("create");
        upsert_entities_at(
            home.path(),
            &n1(),
            vec![
                subscriber("IMSI1"),
                Entity::Apn(ApnEntity {
                    key: "IMSI1".into(),
                    pk: None,
                    config: Default::default(),
                }),
            ],
        )
        .expect("upsert");

        let replacement = Entity::Subscriber(SubscriberEntity {
            key: "IMSI1".into(),
            pk: Some(7),
            config: SubscriberConfig::default(),
        });
        let doc = upsert_entities_at(home.path(), &n1(), vec![replacement.clone()]).expect("upsert");
        assert_eq!(doc.entities.len(), 2, "same key, different kind must coexist");
        assert_eq!(doc.entities[0], replacement);
    }

    #[test]
    fn remove_entity_reports_presence() {
        let home = make_home();
        create_network_at(home.path(), n1(), None).expect("create");
        upsert_entities_at(home.path(), &n1(), vec![subscriber("IMSI1")]).expect("upsert");

        assert!(remove_entity_at(home.path(), &n1(), EntityKind::Subscriber, "IMSI1").unwrap());
        assert!(!remove_entity_at(home.path(), &n1(), EntityKind::Subscriber, "IMSI1").unwrap());
    }

    #[test]
    fn file_directory_lists_and_fetches() {
        let home = make_home();
        create_network_at(home.path(), NetworkId::from("n2"), None).expect("create n2");
        create_network_at(home.path(), n1(), None).expect("create n1");
        upsert_entities_at(home.path(), &n1(), vec![subscriber("IMSI1")]).expect("upsert");

        let directory = FileDirectory::new(home.path());
        let ids: Vec<_> = directory.list_networks().expect("list").into_iter().collect();
        assert_eq!(ids, vec![n1(), NetworkId::from("n2")]);
        assert_eq!(directory.get_entities(&n1()).expect("entities").len(), 1);
    }

    #[test]
    fn unknown_network_is_not_found() {
        let home = make_home();
        let directory = FileDirectory::new(home.path());
        let err = directory.get_entities(&n1()).unwrap_err();
        assert!(matches!(err, DirectoryError::NetworkNotFound { .. }), "got: {err}");
    }

    #[test]
    fn invalid_ids_are_rejected_before_io() {
        let home = make_home();
        let err = create_network_at(home.path(), NetworkId::from("../escape"), None).unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidNetworkId { .. }));
        assert!(!directory_root_at(home.path()).exists());
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(DirectoryError::HomeNotFound.to_string().contains("home directory"));
    }
}
