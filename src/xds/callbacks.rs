use std::sync::Arc;

use tonic::async_trait;

use super::DiscoveryRequest;
use super::DiscoveryResponse;
use super::StreamContext;
use super::StreamId;
use crate::Result;

/// Hooks the discovery server invokes over the life of every stream.
///
/// An error from `on_stream_open` or `on_stream_request` makes the server
/// close the stream; `on_stream_closed` is still invoked afterwards.
#[async_trait]
pub trait StreamCallbacks: Send + Sync + 'static {
    async fn on_stream_open(
        &self,
        stream_id: StreamId,
        ctx: &StreamContext,
    ) -> Result<()>;

    async fn on_stream_request(
        &self,
        stream_id: StreamId,
        request: &dyn DiscoveryRequest,
    ) -> Result<()>;

    async fn on_stream_response(
        &self,
        _stream_id: StreamId,
        _request: &dyn DiscoveryRequest,
        _response: &dyn DiscoveryResponse,
    ) {
    }

    async fn on_stream_closed(
        &self,
        stream_id: StreamId,
    );
}

/// Runs several callbacks in registration order.
///
/// Closing runs in reverse order so that a component opened last is torn
/// down first.
#[derive(Default, Clone)]
pub struct CallbacksChain {
    callbacks: Vec<Arc<dyn StreamCallbacks>>,
}

impl CallbacksChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        callbacks: Arc<dyn StreamCallbacks>,
    ) -> Self {
        self.callbacks.push(callbacks);
        self
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[async_trait]
impl StreamCallbacks for CallbacksChain {
    async fn on_stream_open(
        &self,
        stream_id: StreamId,
        ctx: &StreamContext,
    ) -> Result<()> {
        for cb in &self.callbacks {
            cb.on_stream_open(stream_id, ctx).await?;
        }
        Ok(())
    }

    async fn on_stream_request(
        &self,
        stream_id: StreamId,
        request: &dyn DiscoveryRequest,
    ) -> Result<()> {
        for cb in &self.callbacks {
            cb.on_stream_request(stream_id, request).await?;
        }
        Ok(())
    }

    async fn on_stream_response(
        &self,
        stream_id: StreamId,
        request: &dyn DiscoveryRequest,
        response: &dyn DiscoveryResponse,
    ) {
        for cb in &self.callbacks {
            cb.on_stream_response(stream_id, request, response).await;
        }
    }

    async fn on_stream_closed(
        &self,
        stream_id: StreamId,
    ) {
        for cb in self.callbacks.iter().rev() {
            cb.on_stream_closed(stream_id).await;
        }
    }
}
