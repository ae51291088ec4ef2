//! Network lifecycle reconciliation: live upstream set vs cached set.

use std::collections::BTreeSet;

use subcache_core::NetworkId;

/// Three disjoint, sorted sets derived from one pair of listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Live but never cached: refreshed unconditionally.
    pub new: BTreeSet<NetworkId>,
    /// Cached but no longer live: both records deleted.
    pub removed: BTreeSet<NetworkId>,
    /// Live and cached: subject to the staleness gate.
    pub existing: BTreeSet<NetworkId>,
}

pub fn reconcile<'a>(
    live: &BTreeSet<NetworkId>,
    cached: impl IntoIterator<Item = &'a NetworkId>,
) -> Reconciliation {
    let cached: BTreeSet<&NetworkId> = cached.into_iter().collect();
    let mut out = Reconciliation::default();
    for network in live {
        if cached.contains(network) {
            out.existing.insert(network.clone());
        } else {
            out.new.insert(network.clone());
        }
    }
    out.removed = cached
        .into_iter()
        .filter(|network| !live.contains(*network))
        .cloned()
        .collect();
    out
}
