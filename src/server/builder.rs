use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use super::ControlPlane;
use crate::metrics;
use crate::utils::async_task::spawn_worker;
use crate::Authenticator;
use crate::DataplaneLifecycleFactory;
use crate::DataplaneStatusTracker;
use crate::DataplaneSyncRegistry;
use crate::DataplaneWatchdogFactory;
use crate::DefaultInsightStore;
use crate::DefaultSnapshotReconciler;
use crate::EmptySnapshotGenerator;
use crate::Error;
use crate::MemoryStore;
use crate::NoopAuthenticator;
use crate::ResourceStore;
use crate::Result;
use crate::SnapshotAutoVersioner;
use crate::SnapshotCache;
use crate::SnapshotGenerator;
use crate::XdsSyncConfig;

/// Assembles a [`ControlPlane`] from configuration and pluggable components.
///
/// Components that are not provided fall back to in-process defaults:
/// [`MemoryStore`], [`NoopAuthenticator`] and [`EmptySnapshotGenerator`].
pub struct ControlPlaneBuilder {
    config: XdsSyncConfig,
    store: Option<Arc<dyn ResourceStore>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    generator: Option<Arc<dyn SnapshotGenerator>>,
    versioner: Option<SnapshotAutoVersioner>,
    shutdown_signal: watch::Receiver<()>,
    control_plane: Option<Arc<ControlPlane>>,
}

impl ControlPlaneBuilder {
    pub fn new(
        config: XdsSyncConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store: None,
            authenticator: None,
            generator: None,
            versioner: None,
            shutdown_signal,
            control_plane: None,
        }
    }

    pub fn store(
        mut self,
        store: Arc<dyn ResourceStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn authenticator(
        mut self,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn snapshot_generator(
        mut self,
        generator: Arc<dyn SnapshotGenerator>,
    ) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Overrides how new snapshot versions are minted
    pub fn versioner(
        mut self,
        versioner: SnapshotAutoVersioner,
    ) -> Self {
        self.versioner = Some(versioner);
        self
    }

    /// Wires every component. All lifecycle managers share one shutdown
    /// token so that a control-plane shutdown never deregisters proxies.
    pub fn build(mut self) -> Self {
        let config = self.config.clone();
        let shutdown = CancellationToken::new();

        let store = self.store.take().unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let authenticator = self
            .authenticator
            .take()
            .unwrap_or_else(|| Arc::new(NoopAuthenticator));
        let generator = self
            .generator
            .take()
            .unwrap_or_else(|| Arc::new(EmptySnapshotGenerator));
        let versioner = self.versioner.take().unwrap_or_default();

        let cache = Arc::new(SnapshotCache::new());
        let reconciler = Arc::new(DefaultSnapshotReconciler::new(generator, cache.clone(), versioner));

        let watchdogs = Arc::new(DataplaneWatchdogFactory {
            store: store.clone(),
            reconciler,
            refresh_interval: config.dataplane.refresh_interval(),
        });
        let lifecycles = Arc::new(DataplaneLifecycleFactory {
            store: store.clone(),
            authenticator,
            shutdown: shutdown.clone(),
            cp_instance_id: config.runtime.instance_id.clone(),
            deregistration_delay: config.dataplane.deregistration_delay(),
        });
        let registry = Arc::new(DataplaneSyncRegistry::new(
            watchdogs,
            lifecycles,
            config.dataplane.drain_timeout(),
        ));

        let insight_store = Arc::new(DefaultInsightStore::new(store.clone(), config.insight.max_subscriptions));
        let tracker = Arc::new(DataplaneStatusTracker::new(
            config.runtime.instance_id.clone(),
            insight_store,
            config.insight.flush_interval(),
            config.insight.flush_backoff(),
        ));

        debug!(instance_id = %config.runtime.instance_id, "control plane components wired");
        self.control_plane = Some(Arc::new(ControlPlane {
            config,
            store,
            cache,
            registry,
            tracker,
            shutdown,
            shutdown_signal: self.shutdown_signal.clone(),
        }));
        self
    }

    /// Starts the Prometheus endpoint unless monitoring is disabled.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.prometheus_enabled {
            info!("metrics server disabled");
            return self;
        }
        let port = self.config.monitoring.prometheus_port;
        spawn_worker("metrics-server", metrics::start_server(port, shutdown_signal));
        self
    }

    /// Returns the control plane assembled by [`Self::build`].
    ///
    /// # Errors
    /// Returns `Error::Fatal` if `build()` was not called.
    pub fn ready(self) -> Result<Arc<ControlPlane>> {
        self.control_plane
            .ok_or_else(|| Error::Fatal("control plane has not been built".to_string()))
    }
}
