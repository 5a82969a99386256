use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use crate::metrics::WATCHDOG_SYNC_RESULTS;
use crate::DataplaneMetadata;
use crate::GetOptions;
use crate::Proxy;
use crate::ProxyKey;
use crate::ResourceStore;
use crate::Result;
use crate::SnapshotReconciler;

/// Background worker of one proxy. Runs until `stop` is cancelled; returning
/// from `start` is the completion signal.
#[async_trait]
pub trait Watchdog: Send + 'static {
    async fn start(
        &mut self,
        stop: CancellationToken,
    );
}

pub trait WatchdogFactory: Send + Sync + 'static {
    fn new_watchdog(
        &self,
        key: ProxyKey,
        metadata: Arc<ArcSwap<DataplaneMetadata>>,
    ) -> Box<dyn Watchdog>;
}

impl<F> WatchdogFactory for F
where
    F: Fn(ProxyKey, Arc<ArcSwap<DataplaneMetadata>>) -> Box<dyn Watchdog> + Send + Sync + 'static,
{
    fn new_watchdog(
        &self,
        key: ProxyKey,
        metadata: Arc<ArcSwap<DataplaneMetadata>>,
    ) -> Box<dyn Watchdog> {
        self(key, metadata)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncResult {
    /// The proxy resource does not exist (yet)
    Skip,
    /// A snapshot was generated but matched the cached one
    Generated,
    /// A new snapshot was cached
    Changed,
}

impl SyncResult {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncResult::Skip => "skip",
            SyncResult::Generated => "generated",
            SyncResult::Changed => "changed",
        }
    }
}

pub struct DataplaneWatchdog {
    key: ProxyKey,
    metadata: Arc<ArcSwap<DataplaneMetadata>>,
    store: Arc<dyn ResourceStore>,
    reconciler: Arc<dyn SnapshotReconciler>,
    refresh_interval: Duration,
}

impl DataplaneWatchdog {
    pub fn new(
        key: ProxyKey,
        metadata: Arc<ArcSwap<DataplaneMetadata>>,
        store: Arc<dyn ResourceStore>,
        reconciler: Arc<dyn SnapshotReconciler>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            key,
            metadata,
            store,
            reconciler,
            refresh_interval,
        }
    }

    pub async fn sync(&self) -> Result<SyncResult> {
        let metadata = self.metadata.load_full();
        let kind = metadata.proxy_type.resource_kind();

        let resource = match self
            .store
            .get(kind, GetOptions::by_key(self.key.to_resource_key()))
            .await
        {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                debug!(proxy = %self.key, %kind, "proxy resource not found, skipping");
                return Ok(SyncResult::Skip);
            }
            Err(e) => return Err(e),
        };

        let proxy = Proxy {
            key: self.key.clone(),
            resource,
            metadata,
        };
        if self.reconciler.reconcile(&proxy).await? {
            Ok(SyncResult::Changed)
        } else {
            Ok(SyncResult::Generated)
        }
    }
}

#[async_trait]
impl Watchdog for DataplaneWatchdog {
    async fn start(
        &mut self,
        stop: CancellationToken,
    ) {
        info!(proxy = %self.key, "watchdog started");
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sync().await {
                        Ok(result) => {
                            WATCHDOG_SYNC_RESULTS.with_label_values(&[result.as_str()]).inc();
                            trace!(proxy = %self.key, result = result.as_str(), "synchronized");
                        }
                        Err(e) => {
                            WATCHDOG_SYNC_RESULTS.with_label_values(&["error"]).inc();
                            error!(proxy = %self.key, "could not synchronize proxy: {}", e);
                        }
                    }
                }
            }
        }

        self.reconciler.clear(&self.key);
        info!(proxy = %self.key, "watchdog stopped");
    }
}

/// Builds a [`DataplaneWatchdog`] per proxy.
pub struct DataplaneWatchdogFactory {
    pub store: Arc<dyn ResourceStore>,
    pub reconciler: Arc<dyn SnapshotReconciler>,
    pub refresh_interval: Duration,
}

impl WatchdogFactory for DataplaneWatchdogFactory {
    fn new_watchdog(
        &self,
        key: ProxyKey,
        metadata: Arc<ArcSwap<DataplaneMetadata>>,
    ) -> Box<dyn Watchdog> {
        Box::new(DataplaneWatchdog::new(
            key,
            metadata,
            self.store.clone(),
            self.reconciler.clone(),
            self.refresh_interval,
        ))
    }
}
