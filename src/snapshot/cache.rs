use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::Snapshot;

/// Latest snapshot per node, shared with the discovery server.
///
/// [`SnapshotCache::clear`] stores an explicitly empty snapshot instead of
/// forgetting the node: connected proxies are told to drop every resource,
/// whereas a missing entry means nothing is pushed at all.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    snapshots: DashMap<String, Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        node: &str,
    ) -> Option<Arc<Snapshot>> {
        self.snapshots.get(node).map(|s| s.value().clone())
    }

    pub fn cache(
        &self,
        node: &str,
        snapshot: Snapshot,
    ) {
        self.snapshots.insert(node.to_string(), Arc::new(snapshot));
    }

    pub fn clear(
        &self,
        node: &str,
    ) {
        debug!(node, "clearing snapshot");
        self.snapshots.insert(node.to_string(), Arc::new(Snapshot::new()));
    }

    pub fn has(
        &self,
        node: &str,
    ) -> bool {
        self.snapshots.contains_key(node)
    }

    /// Forgets the node entirely.
    pub fn remove(
        &self,
        node: &str,
    ) -> Option<Arc<Snapshot>> {
        self.snapshots.remove(node).map(|(_, s)| s)
    }
}
