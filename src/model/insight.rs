use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::DiscoverySubscription;
use crate::Result;

/// Persisted subscription history of one proxy, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyInsight {
    #[serde(default)]
    pub subscriptions: Vec<DiscoverySubscription>,
}

impl ProxyInsight {
    /// Reads the insight out of a stored spec. An empty spec is an empty history.
    pub fn from_spec(spec: &Value) -> Result<Self> {
        match spec {
            Value::Null => Ok(Self::default()),
            Value::Object(fields) if fields.is_empty() => Ok(Self::default()),
            other => Ok(serde_json::from_value(other.clone())?),
        }
    }

    pub fn to_spec(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn last_subscription(&self) -> Option<&DiscoverySubscription> {
        self.subscriptions.last()
    }

    /// Merges a subscription into the history.
    ///
    /// A subscription with a known id replaces the stored one in place. A new
    /// subscription first finalizes every still-open entry, since a proxy
    /// holds at most one live stream from the history's point of view, and is
    /// then appended. The oldest entries are dropped above `limit`.
    pub fn update_subscription(
        &mut self,
        subscription: DiscoverySubscription,
        limit: usize,
    ) {
        if let Some(existing) = self.subscriptions.iter_mut().find(|s| s.id == subscription.id) {
            *existing = subscription;
            return;
        }

        let finalized_at = subscription.connect_time;
        for open in self.subscriptions.iter_mut().filter(|s| s.is_connected()) {
            open.mark_disconnected(finalized_at);
        }
        self.subscriptions.push(subscription);

        let limit = limit.max(1);
        if self.subscriptions.len() > limit {
            let excess = self.subscriptions.len() - limit;
            self.subscriptions.drain(..excess);
        }
    }
}
