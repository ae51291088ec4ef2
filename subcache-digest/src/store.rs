//! Digest stores: the durable side of the cache.
//!
//! [`DigestStore`] and [`PerSubscriberDigestStore`] are the read surface used
//! by consumers. Writes only go through [`RenewalStore::commit`] and
//! [`RenewalStore::remove`], which update both records of a network as one
//! unit.
//!
//! [`FileDigestStore`] persists one JSON document per network at
//! `<home>/.subcache/digests/<network>.json` holding both records. Writes use
//! the atomic `.tmp` + rename pattern, so a reader sees either the previous
//! pair or the new pair, never a mix.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use subcache_core::{NetworkDigestRecord, NetworkId, PerSubscriberDigestRecord, SubscriberDigestEntry};

use crate::error::{io_err, StoreError};

/// Sequence number folded into tmp file names; unique per write in this process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// `networkID -> (digest, lastRenewedAt)`
pub trait DigestStore: Send + Sync {
    fn get_digest(&self, network: &NetworkId) -> Result<Option<NetworkDigestRecord>, StoreError>;

    /// Every cached network, ascending.
    fn list_networks(&self) -> Result<Vec<NetworkId>, StoreError>;
}

/// `networkID -> ordered [(subscriberID, digest)]`
pub trait PerSubscriberDigestStore: Send + Sync {
    /// Subscriber digests of `network` ascending by ID; empty if unknown.
    fn get_subscriber_digests(
        &self,
        network: &NetworkId,
    ) -> Result<Vec<SubscriberDigestEntry>, StoreError>;
}

/// Transactional writes over both stores.
pub trait RenewalStore: DigestStore + PerSubscriberDigestStore {
    /// Put the network record and replace the whole subscriber list.
    fn commit(
        &self,
        record: &NetworkDigestRecord,
        subscribers: &PerSubscriberDigestRecord,
    ) -> Result<(), StoreError>;

    /// Delete both records. Returns `false` if nothing was cached.
    fn remove(&self, network: &NetworkId) -> Result<bool, StoreError>;
}

/// On-disk document for one network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedNetworkFile {
    pub network_id: NetworkId,
    pub digest: String,
    pub last_renewed_at: DateTime<Utc>,
    #[serde(default)]
    pub subscribers: Vec<SubscriberDigestEntry>,
}

impl CachedNetworkFile {
    fn record(&self) -> NetworkDigestRecord {
        NetworkDigestRecord {
            network_id: self.network_id.clone(),
            digest: self.digest.clone(),
            last_renewed_at: self.last_renewed_at,
        }
    }
}

/// `<home>/.subcache/digests/`
pub fn digests_root_at(home: &Path) -> PathBuf {
    home.join(".subcache").join("digests")
}

#[derive(Debug, Clone)]
pub struct FileDigestStore {
    root: PathBuf,
}

impl FileDigestStore {
    /// Store documents directly under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<home>/.subcache/digests/`.
    pub fn at_home(home: &Path) -> Self {
        Self::new(digests_root_at(home))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<network>.json`: pure, no I/O.
    pub fn document_path(&self, network: &NetworkId) -> PathBuf {
        self.root.join(format!("{}.json", network.0))
    }

    /// Load the whole document for `network`, if cached.
    pub fn load(&self, network: &NetworkId) -> Result<Option<CachedNetworkFile>, StoreError> {
        ensure_valid(network)?;
        let path = self.document_path(network);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Parse { path, source })
    }

    fn save(&self, doc: &CachedNetworkFile) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;

        let path = self.document_path(&doc.network_id);
        let json = serde_json::to_string_pretty(doc)?;
        // Unique per write: concurrent writers of one network never share a tmp file.
        let tmp = path.with_file_name(format!(
            "{}.json.{}.{}.tmp",
            doc.network_id.0,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(err) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, err));
        }
        Ok(())
    }
}

impl DigestStore for FileDigestStore {
    fn get_digest(&self, network: &NetworkId) -> Result<Option<NetworkDigestRecord>, StoreError> {
        Ok(self.load(network)?.map(|doc| doc.record()))
    }

    fn list_networks(&self) -> Result<Vec<NetworkId>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(io_err(&self.root, err)),
        };
        let mut networks = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_err(&self.root, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let id = NetworkId::from(stem.to_string_lossy().into_owned());
            if id.is_valid() {
                networks.push(id);
            }
        }
        networks.sort();
        Ok(networks)
    }
}

impl PerSubscriberDigestStore for FileDigestStore {
    fn get_subscriber_digests(
        &self,
        network: &NetworkId,
    ) -> Result<Vec<SubscriberDigestEntry>, StoreError> {
        Ok(self
            .load(network)?
            .map(|doc| doc.subscribers)
            .unwrap_or_default())
    }
}

impl RenewalStore for FileDigestStore {
    fn commit(
        &self,
        record: &NetworkDigestRecord,
        subscribers: &PerSubscriberDigestRecord,
    ) -> Result<(), StoreError> {
        if record.network_id != subscribers.network_id {
            return Err(StoreError::MismatchedRecords {
                record: record.network_id.clone(),
                subscribers: subscribers.network_id.clone(),
            });
        }
        ensure_valid(&record.network_id)?;
        self.save(&CachedNetworkFile {
            network_id: record.network_id.clone(),
            digest: record.digest.clone(),
            last_renewed_at: record.last_renewed_at,
            subscribers: subscribers.entries.clone(),
        })
    }

    fn remove(&self, network: &NetworkId) -> Result<bool, StoreError> {
        ensure_valid(network)?;
        let path = self.document_path(network);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_err(&path, err)),
        }
    }
}

fn ensure_valid(network: &NetworkId) -> Result<(), StoreError> {
    if network.is_valid() {
        Ok(())
    } else {
        Err(StoreError::InvalidNetworkId {
            network: network.clone(),
        })
    }
}
