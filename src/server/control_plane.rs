use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::CallbacksChain;
use crate::DataplaneStatusTracker;
use crate::DataplaneSyncRegistry;
use crate::ResourceStore;
use crate::Result;
use crate::SnapshotCache;
use crate::XdsSyncConfig;

/// A running synchronization engine.
///
/// The discovery server drives it through [`ControlPlane::callbacks`] and
/// serves whatever [`ControlPlane::snapshot_cache`] holds.
pub struct ControlPlane {
    pub(super) config: XdsSyncConfig,
    pub(super) store: Arc<dyn ResourceStore>,
    pub(super) cache: Arc<SnapshotCache>,
    pub(super) registry: Arc<DataplaneSyncRegistry>,
    pub(super) tracker: Arc<DataplaneStatusTracker>,
    pub(super) shutdown: CancellationToken,
    pub(super) shutdown_signal: watch::Receiver<()>,
}

impl ControlPlane {
    /// Stream callbacks in the order the discovery server must invoke them:
    /// the sync registry first, then the status tracker.
    pub fn callbacks(&self) -> CallbacksChain {
        CallbacksChain::new()
            .with(self.registry.clone())
            .with(self.tracker.clone())
    }

    pub fn config(&self) -> &XdsSyncConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ResourceStore> {
        self.store.clone()
    }

    pub fn snapshot_cache(&self) -> Arc<SnapshotCache> {
        self.cache.clone()
    }

    pub fn registry(&self) -> Arc<DataplaneSyncRegistry> {
        self.registry.clone()
    }

    pub fn tracker(&self) -> Arc<DataplaneStatusTracker> {
        self.tracker.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Waits for the shutdown signal, then shuts down.
    pub async fn run(&self) -> Result<()> {
        let mut signal = self.shutdown_signal.clone();
        if signal.changed().await.is_err() {
            info!("shutdown signal sender dropped");
        }
        self.shutdown().await;
        Ok(())
    }

    /// Marks the control plane as shutting down and stops every watchdog.
    ///
    /// Proxies stay registered: lifecycle managers observe the cancelled
    /// token and skip deregistration, so that another instance can take
    /// over the streams.
    pub async fn shutdown(&self) {
        info!(instance_id = %self.config.runtime.instance_id, "shutting down control plane");
        self.shutdown.cancel();
        self.registry.drain().await;
        info!("control plane stopped");
    }
}
