use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::InsightStore;
use crate::metrics::INSIGHT_FLUSHES;
use crate::DiscoverySubscription;
use crate::ProxyKey;
use crate::ProxyType;

/// Consistent copy of the telemetry of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionStatus {
    pub key: ProxyKey,
    pub proxy_type: ProxyType,
    pub subscription: DiscoverySubscription,
}

pub trait SubscriptionStatusAccessor: Send + Sync + 'static {
    /// `None` until the stream resolved a proxy.
    fn get_status(&self) -> Option<SubscriptionStatus>;
}

/// Periodically writes the status of one stream into its proxy's insight.
///
/// Writes are skipped while the status equals the last stored one. A
/// conflicting concurrent writer is not an error: the next tick retries.
pub struct InsightSink {
    accessor: Arc<dyn SubscriptionStatusAccessor>,
    store: Arc<dyn InsightStore>,
    flush_interval: Duration,
    flush_backoff: Duration,
    last_stored: Option<DiscoverySubscription>,
}

impl InsightSink {
    pub fn new(
        accessor: Arc<dyn SubscriptionStatusAccessor>,
        store: Arc<dyn InsightStore>,
        flush_interval: Duration,
        flush_backoff: Duration,
    ) -> Self {
        Self {
            accessor,
            store,
            flush_interval,
            flush_backoff,
            last_stored: None,
        }
    }

    /// Flushes right away and on every tick until `stop` is cancelled, then
    /// performs a final flush.
    pub async fn start(
        mut self,
        stop: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    if self.flush(false).await {
                        tokio::select! {
                            _ = stop.cancelled() => break,
                            _ = tokio::time::sleep(self.flush_backoff) => {}
                        }
                    }
                }
            }
        }

        self.flush(true).await;
    }

    /// Returns true when a new status was stored.
    pub async fn flush(
        &mut self,
        closing: bool,
    ) -> bool {
        let Some(status) = self.accessor.get_status() else {
            return false;
        };
        if self.last_stored.as_ref() == Some(&status.subscription) {
            trace!(proxy = %status.key, "subscription unchanged, skipping flush");
            INSIGHT_FLUSHES.with_label_values(&["skipped"]).inc();
            return false;
        }

        match self
            .store
            .upsert(status.proxy_type, &status.key, &status.subscription)
            .await
        {
            Ok(()) => {
                debug!(proxy = %status.key, subscription_id = %status.subscription.id, "subscription status stored");
                INSIGHT_FLUSHES.with_label_values(&["stored"]).inc();
                self.last_stored = Some(status.subscription);
                true
            }
            Err(e) => {
                INSIGHT_FLUSHES.with_label_values(&["failed"]).inc();
                if closing {
                    // the proxy may have been deleted concurrently
                    debug!(proxy = %status.key, "final flush failed: {}", e);
                } else if e.is_conflict() {
                    debug!(proxy = %status.key, "insight modified concurrently, retrying next tick: {}", e);
                } else {
                    error!(proxy = %status.key, "could not store subscription status: {}", e);
                }
                false
            }
        }
    }
}
