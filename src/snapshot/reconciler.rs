use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tonic::async_trait;
use tracing::debug;
use tracing::error;

use super::SnapshotAutoVersioner;
use super::SnapshotCache;
use crate::Proxy;
use crate::ProxyKey;
use crate::Result;
use crate::Snapshot;

/// Produces the discovery resources of a proxy from the current mesh state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotGenerator: Send + Sync + 'static {
    async fn generate_snapshot(
        &self,
        proxy: &Proxy,
    ) -> Result<Snapshot>;
}

/// Generates no resources. Connected proxies keep an empty configuration
/// until a real generator is plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySnapshotGenerator;

#[async_trait]
impl SnapshotGenerator for EmptySnapshotGenerator {
    async fn generate_snapshot(
        &self,
        _proxy: &Proxy,
    ) -> Result<Snapshot> {
        Ok(Snapshot::new())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotReconciler: Send + Sync + 'static {
    /// Regenerates and caches the proxy's snapshot. Returns whether the
    /// cached snapshot changed.
    async fn reconcile(
        &self,
        proxy: &Proxy,
    ) -> Result<bool>;

    /// Replaces the proxy's snapshot with an explicitly empty one.
    fn clear(
        &self,
        key: &ProxyKey,
    );
}

pub struct DefaultSnapshotReconciler {
    generator: Arc<dyn SnapshotGenerator>,
    cache: Arc<SnapshotCache>,
    versioner: SnapshotAutoVersioner,
}

impl DefaultSnapshotReconciler {
    pub fn new(
        generator: Arc<dyn SnapshotGenerator>,
        cache: Arc<SnapshotCache>,
        versioner: SnapshotAutoVersioner,
    ) -> Self {
        Self {
            generator,
            cache,
            versioner,
        }
    }
}

#[async_trait]
impl SnapshotReconciler for DefaultSnapshotReconciler {
    async fn reconcile(
        &self,
        proxy: &Proxy,
    ) -> Result<bool> {
        let node = proxy.node_hash();
        let generated = self.generator.generate_snapshot(proxy).await?;

        let previous = self.cache.get(&node);
        let snapshot = self.versioner.version(generated, previous.as_deref());

        // an inconsistent snapshot is still served
        if let Err(e) = snapshot.consistent() {
            error!(proxy = %proxy.key, "inconsistent snapshot: {}", e);
        }

        if let Some(previous) = previous {
            if previous.versions() == snapshot.versions() {
                debug!(proxy = %proxy.key, "snapshot unchanged");
                return Ok(false);
            }
        }

        debug!(proxy = %proxy.key, versions = ?snapshot.versions(), "caching new snapshot");
        self.cache.cache(&node, snapshot);
        Ok(true)
    }

    fn clear(
        &self,
        key: &ProxyKey,
    ) {
        self.cache.clear(&key.node_hash());
    }
}
