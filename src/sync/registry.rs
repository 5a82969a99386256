//! Stream registry and proxy multiplexer.
//!
//! Many discovery streams may resolve to the same proxy, for instance while a
//! proxy reconnects before its old connection is noticed as dead. The registry
//! guarantees a single watchdog per [`ProxyKey`]: the first stream that
//! resolves the key registers the proxy and starts the watchdog, and the
//! watchdog is stopped only once no stream of the proxy remains.
//!
//! ## Locking
//! The registry lock is always taken before the per-proxy state lock, and
//! neither is held across store or watchdog calls. A proxy entry is
//! published in the `Starting` phase before registration runs and is
//! removed only after its watchdog has returned, so a request for the same
//! key waits for the phase to change instead of starting a second watchdog.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::LifecycleManager;
use super::LifecycleManagerFactory;
use super::WatchdogFactory;
use crate::metrics::ACTIVE_PROXIES;
use crate::metrics::ACTIVE_STREAMS;
use crate::utils::async_task::join_all_with_timeout;
use crate::utils::async_task::spawn_worker;
use crate::DataplaneMetadata;
use crate::DiscoveryRequest;
use crate::LifecycleError;
use crate::ProtocolError;
use crate::ProxyKey;
use crate::Result;
use crate::StreamCallbacks;
use crate::StreamContext;
use crate::StreamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyPhase {
    /// Registration in progress, no watchdog yet
    Starting,
    Running,
    /// Last stream closed, watchdog shutting down
    Stopping,
    /// Entry removed from the registry
    Stopped,
}

struct ProxyState {
    /// Resolved streams in connection order
    streams: Vec<StreamId>,
    worker: Option<JoinHandle<()>>,
}

struct ProxyInfo {
    key: ProxyKey,
    state: Mutex<ProxyState>,
    phase: watch::Sender<ProxyPhase>,
    metadata: Arc<ArcSwap<DataplaneMetadata>>,
    cancel: CancellationToken,
    lifecycle: Arc<dyn LifecycleManager>,
}

impl ProxyInfo {
    fn new(
        key: ProxyKey,
        metadata: Arc<DataplaneMetadata>,
        lifecycle: Arc<dyn LifecycleManager>,
        first_stream: StreamId,
    ) -> Self {
        let (phase, _) = watch::channel(ProxyPhase::Starting);
        Self {
            key,
            state: Mutex::new(ProxyState {
                streams: vec![first_stream],
                worker: None,
            }),
            phase,
            metadata: Arc::new(ArcSwap::new(metadata)),
            cancel: CancellationToken::new(),
            lifecycle,
        }
    }

    fn phase(&self) -> ProxyPhase {
        *self.phase.borrow()
    }
}

struct StreamInfo {
    ctx: StreamContext,
    proxy: Option<Arc<ProxyInfo>>,
}

#[derive(Default)]
struct Registry {
    streams: HashMap<StreamId, StreamInfo>,
    proxies: HashMap<ProxyKey, Arc<ProxyInfo>>,
}

impl Registry {
    fn remove_proxy(
        &mut self,
        proxy: &Arc<ProxyInfo>,
    ) {
        if self
            .proxies
            .get(&proxy.key)
            .is_some_and(|current| Arc::ptr_eq(current, proxy))
        {
            self.proxies.remove(&proxy.key);
        }
    }
}

enum Resolution {
    Wait(watch::Receiver<ProxyPhase>, ProxyPhase),
    Start(Arc<ProxyInfo>, StreamContext),
}

/// Owns every open stream and the proxy it resolved to.
pub struct DataplaneSyncRegistry {
    inner: Mutex<Registry>,
    /// Cancelled by `drain()`; no proxy is resolved afterwards
    draining: CancellationToken,
    watchdogs: Arc<dyn WatchdogFactory>,
    lifecycles: Arc<dyn LifecycleManagerFactory>,
    drain_timeout: Duration,
}

impl DataplaneSyncRegistry {
    pub fn new(
        watchdogs: Arc<dyn WatchdogFactory>,
        lifecycles: Arc<dyn LifecycleManagerFactory>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
            draining: CancellationToken::new(),
            watchdogs,
            lifecycles,
            drain_timeout,
        }
    }

    pub fn stream_count(&self) -> usize {
        self.inner.lock().streams.len()
    }

    pub fn proxy_count(&self) -> usize {
        self.inner.lock().proxies.len()
    }

    pub fn has_proxy(
        &self,
        key: &ProxyKey,
    ) -> bool {
        self.inner.lock().proxies.contains_key(key)
    }

    /// Streams resolved to `key`, in connection order.
    pub fn proxy_streams(
        &self,
        key: &ProxyKey,
    ) -> Vec<StreamId> {
        let inner = self.inner.lock();
        inner
            .proxies
            .get(key)
            .map(|proxy| proxy.state.lock().streams.clone())
            .unwrap_or_default()
    }

    /// Live metadata of a proxy as seen by its watchdog.
    pub fn proxy_metadata(
        &self,
        key: &ProxyKey,
    ) -> Option<Arc<DataplaneMetadata>> {
        self.inner.lock().proxies.get(key).map(|p| p.metadata.load_full())
    }

    /// Stops every watchdog without deregistering proxies and waits up to the
    /// drain timeout for them to return. Streams that resolve afterwards are
    /// rejected.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut inner = self.inner.lock();
            self.draining.cancel();
            let mut handles = Vec::with_capacity(inner.proxies.len());
            for (_, proxy) in inner.proxies.drain() {
                proxy.cancel.cancel();
                if let Some(handle) = proxy.state.lock().worker.take() {
                    handles.push(handle);
                    ACTIVE_PROXIES.dec();
                }
                proxy.phase.send_replace(ProxyPhase::Stopped);
            }
            handles
        };

        info!("draining {} watchdogs", handles.len());
        let pending = join_all_with_timeout(handles, self.drain_timeout).await;
        if pending > 0 {
            warn!("{} watchdogs did not stop within {:?}", pending, self.drain_timeout);
        }
    }

    async fn start_proxy(
        &self,
        stream_id: StreamId,
        proxy: Arc<ProxyInfo>,
        ctx: &StreamContext,
        metadata: &DataplaneMetadata,
    ) -> Result<()> {
        if let Err(e) = proxy.lifecycle.register(ctx, metadata).await {
            warn!(proxy = %proxy.key, %stream_id, "could not register proxy: {}", e);
            let mut inner = self.inner.lock();
            if let Some(stream) = inner.streams.get_mut(&stream_id) {
                stream.proxy = None;
            }
            inner.remove_proxy(&proxy);
            proxy.phase.send_replace(ProxyPhase::Stopped);
            return Err(e);
        }

        let mut watchdog = self
            .watchdogs
            .new_watchdog(proxy.key.clone(), proxy.metadata.clone());
        let stop = proxy.cancel.clone();

        let mut inner = self.inner.lock();
        if self.draining.is_cancelled() {
            debug!(proxy = %proxy.key, %stream_id, "registry drained, watchdog not started");
            if let Some(stream) = inner.streams.get_mut(&stream_id) {
                stream.proxy = None;
            }
            inner.remove_proxy(&proxy);
            proxy.phase.send_replace(ProxyPhase::Stopped);
            return Err(LifecycleError::Aborted(proxy.key.to_string()).into());
        }
        let handle = spawn_worker(&format!("watchdog-{}", proxy.key), async move {
            watchdog.start(stop).await;
        });
        proxy.state.lock().worker = Some(handle);
        proxy.phase.send_replace(ProxyPhase::Running);
        ACTIVE_PROXIES.inc();
        info!(proxy = %proxy.key, %stream_id, "proxy connected, watchdog started");
        Ok(())
    }

    async fn stop_proxy(
        &self,
        proxy: Arc<ProxyInfo>,
        worker: Option<JoinHandle<()>>,
    ) {
        proxy.cancel.cancel();
        if let Err(e) = proxy.lifecycle.deregister().await {
            error!(proxy = %proxy.key, "could not deregister proxy: {}", e);
        }

        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                warn!(proxy = %proxy.key, "watchdog terminated abnormally: {:?}", e);
            }
            ACTIVE_PROXIES.dec();
        }

        let mut inner = self.inner.lock();
        inner.remove_proxy(&proxy);
        proxy.phase.send_replace(ProxyPhase::Stopped);
        info!(proxy = %proxy.key, "proxy disconnected, watchdog stopped");
    }
}

/// Stores the metadata of a repeated request on a resolved stream. The stream
/// stays bound to its proxy, so neither the identity nor the proxy type may
/// change.
fn refresh_metadata(
    proxy: &ProxyInfo,
    key: &ProxyKey,
    metadata: Arc<DataplaneMetadata>,
) -> Result<()> {
    if proxy.key != *key {
        return Err(ProtocolError::IdentityMismatch {
            expected: proxy.key.to_string(),
            actual: key.to_string(),
        }
        .into());
    }
    let current = proxy.metadata.load();
    if current.proxy_type != metadata.proxy_type {
        return Err(ProtocolError::InvalidMetadata(format!(
            "proxy type of {} changed from {} to {}",
            key,
            current.proxy_type.as_str(),
            metadata.proxy_type.as_str()
        ))
        .into());
    }
    proxy.metadata.store(metadata);
    Ok(())
}

#[async_trait]
impl StreamCallbacks for DataplaneSyncRegistry {
    async fn on_stream_open(
        &self,
        stream_id: StreamId,
        ctx: &StreamContext,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.streams.contains_key(&stream_id) {
            return Err(ProtocolError::DuplicateStream(stream_id).into());
        }
        inner.streams.insert(
            stream_id,
            StreamInfo {
                ctx: ctx.clone(),
                proxy: None,
            },
        );
        ACTIVE_STREAMS.inc();
        debug!(%stream_id, "stream opened");
        Ok(())
    }

    async fn on_stream_request(
        &self,
        stream_id: StreamId,
        request: &dyn DiscoveryRequest,
    ) -> Result<()> {
        let node_id = request.node_id();
        if node_id.is_empty() {
            return Ok(());
        }
        let key = ProxyKey::from_node_id(node_id)?;
        let metadata = DataplaneMetadata::from_node_metadata(request.metadata())?;
        metadata.validate_identity(&key)?;
        let metadata = Arc::new(metadata);

        loop {
            let resolution = {
                let mut inner = self.inner.lock();
                let Registry { streams, proxies } = &mut *inner;
                let stream = streams
                    .get_mut(&stream_id)
                    .ok_or(ProtocolError::UnknownStream(stream_id))?;

                if let Some(proxy) = &stream.proxy {
                    return refresh_metadata(proxy, &key, metadata);
                }
                if self.draining.is_cancelled() {
                    return Err(LifecycleError::Aborted(key.to_string()).into());
                }

                match proxies.get(&key) {
                    Some(proxy) => match proxy.phase() {
                        ProxyPhase::Running => {
                            proxy.state.lock().streams.push(stream_id);
                            proxy.metadata.store(metadata.clone());
                            stream.proxy = Some(proxy.clone());
                            debug!(proxy = %key, %stream_id, "stream joined running proxy");
                            return Ok(());
                        }
                        phase => Resolution::Wait(proxy.phase.subscribe(), phase),
                    },
                    None => {
                        let lifecycle = self.lifecycles.new_manager(&key);
                        let proxy = Arc::new(ProxyInfo::new(key.clone(), metadata.clone(), lifecycle, stream_id));
                        proxies.insert(key.clone(), proxy.clone());
                        stream.proxy = Some(proxy.clone());
                        Resolution::Start(proxy, stream.ctx.clone())
                    }
                }
            };

            match resolution {
                Resolution::Wait(mut phase_rx, observed) => {
                    debug!(proxy = %key, %stream_id, ?observed, "waiting for proxy transition");
                    let _ = phase_rx.wait_for(|phase| *phase != observed).await;
                }
                Resolution::Start(proxy, ctx) => {
                    return self.start_proxy(stream_id, proxy, &ctx, &metadata).await;
                }
            }
        }
    }

    async fn on_stream_closed(
        &self,
        stream_id: StreamId,
    ) {
        let proxy = {
            let mut inner = self.inner.lock();
            let Some(stream) = inner.streams.remove(&stream_id) else {
                warn!(%stream_id, "close of unknown stream");
                return;
            };
            ACTIVE_STREAMS.dec();
            match stream.proxy {
                Some(proxy) => proxy,
                None => {
                    debug!(%stream_id, "unresolved stream closed");
                    return;
                }
            }
        };

        let worker = loop {
            let mut phase_rx = {
                let _inner = self.inner.lock();
                match proxy.phase() {
                    ProxyPhase::Starting => proxy.phase.subscribe(),
                    ProxyPhase::Running => {
                        let mut state = proxy.state.lock();
                        state.streams.retain(|id| *id != stream_id);
                        if !state.streams.is_empty() {
                            debug!(
                                proxy = %proxy.key,
                                %stream_id,
                                remaining = state.streams.len(),
                                "stream closed, proxy still connected"
                            );
                            return;
                        }
                        proxy.phase.send_replace(ProxyPhase::Stopping);
                        break state.worker.take();
                    }
                    ProxyPhase::Stopping | ProxyPhase::Stopped => {
                        proxy.state.lock().streams.retain(|id| *id != stream_id);
                        return;
                    }
                }
            };
            let _ = phase_rx.wait_for(|phase| *phase != ProxyPhase::Starting).await;
        };

        self.stop_proxy(proxy, worker).await;
    }
}
