use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tracing::debug;
use tracing::warn;

use super::InsightSink;
use super::InsightStore;
use super::SubscriptionStatus;
use super::SubscriptionStatusAccessor;
use crate::metrics::XDS_RESPONSES;
use crate::short_type;
use crate::utils::async_task::spawn_worker;
use crate::DataplaneMetadata;
use crate::DiscoveryRequest;
use crate::DiscoveryResponse;
use crate::DiscoverySubscription;
use crate::ProtocolError;
use crate::ProxyKey;
use crate::ProxyType;
use crate::Result;
use crate::StreamCallbacks;
use crate::StreamContext;
use crate::StreamId;

struct StreamStatus {
    key: Option<ProxyKey>,
    proxy_type: ProxyType,
    subscription: DiscoverySubscription,
}

struct StreamState {
    status: Mutex<StreamStatus>,
    stop: CancellationToken,
    sink: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionStatusAccessor for StreamState {
    fn get_status(&self) -> Option<SubscriptionStatus> {
        let status = self.status.lock();
        let key = status.key.clone()?;
        Some(SubscriptionStatus {
            key,
            proxy_type: status.proxy_type,
            subscription: status.subscription.clone(),
        })
    }
}

/// Accumulates discovery telemetry per stream and runs one [`InsightSink`]
/// per resolved stream.
pub struct DataplaneStatusTracker {
    cp_instance_id: String,
    streams: Mutex<HashMap<StreamId, Arc<StreamState>>>,
    insight_store: Arc<dyn InsightStore>,
    flush_interval: Duration,
    flush_backoff: Duration,
}

impl DataplaneStatusTracker {
    pub fn new(
        cp_instance_id: impl Into<String>,
        insight_store: Arc<dyn InsightStore>,
        flush_interval: Duration,
        flush_backoff: Duration,
    ) -> Self {
        Self {
            cp_instance_id: cp_instance_id.into(),
            streams: Mutex::new(HashMap::new()),
            insight_store,
            flush_interval,
            flush_backoff,
        }
    }

    /// Current telemetry of an open stream.
    pub fn subscription(
        &self,
        stream_id: StreamId,
    ) -> Option<DiscoverySubscription> {
        let state = self.streams.lock().get(&stream_id).cloned()?;
        let subscription = state.status.lock().subscription.clone();
        Some(subscription)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }

    fn state(
        &self,
        stream_id: StreamId,
    ) -> Option<Arc<StreamState>> {
        self.streams.lock().get(&stream_id).cloned()
    }

    fn start_sink(
        &self,
        stream_id: StreamId,
        state: &Arc<StreamState>,
    ) {
        let sink = InsightSink::new(
            state.clone(),
            self.insight_store.clone(),
            self.flush_interval,
            self.flush_backoff,
        );
        let handle = spawn_worker(&format!("insight-sink-{stream_id}"), sink.start(state.stop.clone()));
        *state.sink.lock() = Some(handle);
    }
}

#[async_trait]
impl StreamCallbacks for DataplaneStatusTracker {
    async fn on_stream_open(
        &self,
        stream_id: StreamId,
        _ctx: &StreamContext,
    ) -> Result<()> {
        let mut streams = self.streams.lock();
        if streams.contains_key(&stream_id) {
            return Err(ProtocolError::DuplicateStream(stream_id).into());
        }
        let subscription = DiscoverySubscription::new(self.cp_instance_id.clone(), SystemTime::now());
        debug!(%stream_id, subscription_id = %subscription.id, "subscription started");
        streams.insert(
            stream_id,
            Arc::new(StreamState {
                status: Mutex::new(StreamStatus {
                    key: None,
                    proxy_type: ProxyType::default(),
                    subscription,
                }),
                stop: CancellationToken::new(),
                sink: Mutex::new(None),
            }),
        );
        Ok(())
    }

    async fn on_stream_request(
        &self,
        stream_id: StreamId,
        request: &dyn DiscoveryRequest,
    ) -> Result<()> {
        let state = self
            .state(stream_id)
            .ok_or(ProtocolError::UnknownStream(stream_id))?;

        let resolved = {
            let mut status = state.status.lock();
            let mut resolved = false;

            if status.key.is_none() && !request.node_id().is_empty() {
                match ProxyKey::from_node_id(request.node_id())
                    .and_then(|key| Ok((key, DataplaneMetadata::from_node_metadata(request.metadata())?)))
                {
                    Ok((key, metadata)) => {
                        debug!(%stream_id, proxy = %key, "subscription resolved");
                        status.key = Some(key);
                        status.proxy_type = metadata.proxy_type;
                        status.subscription.version = metadata.version;
                        resolved = true;
                    }
                    Err(e) => debug!(%stream_id, "cannot resolve proxy: {}", e),
                }
            }

            if !request.response_nonce().is_empty() {
                let rejected = request.has_errors();
                status
                    .subscription
                    .record_reply(request.type_url(), rejected, SystemTime::now());
                let outcome = if rejected { "rejected" } else { "acknowledged" };
                XDS_RESPONSES
                    .with_label_values(&[short_type(request.type_url()), outcome])
                    .inc();
            }
            resolved
        };

        if resolved {
            self.start_sink(stream_id, &state);
        }
        Ok(())
    }

    async fn on_stream_response(
        &self,
        stream_id: StreamId,
        _request: &dyn DiscoveryRequest,
        response: &dyn DiscoveryResponse,
    ) {
        let Some(state) = self.state(stream_id) else {
            debug!(%stream_id, "response on unknown stream");
            return;
        };
        state
            .status
            .lock()
            .subscription
            .record_response(response.type_url(), SystemTime::now());
        XDS_RESPONSES
            .with_label_values(&[short_type(response.type_url()), "sent"])
            .inc();
    }

    async fn on_stream_closed(
        &self,
        stream_id: StreamId,
    ) {
        let Some(state) = self.streams.lock().remove(&stream_id) else {
            warn!(%stream_id, "close of unknown stream");
            return;
        };

        state.status.lock().subscription.mark_disconnected(SystemTime::now());
        state.stop.cancel();

        let sink = state.sink.lock().take();
        if let Some(handle) = sink {
            if let Err(e) = handle.await {
                warn!(%stream_id, "insight sink terminated abnormally: {:?}", e);
            }
        }
        debug!(%stream_id, "subscription finished");
    }
}
