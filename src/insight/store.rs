use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::upsert;
use crate::DiscoverySubscription;
use crate::ProxyInsight;
use crate::ProxyKey;
use crate::ProxyType;
use crate::ResourceStore;
use crate::Result;

/// Persists subscription telemetry into the insight resource of a proxy.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InsightStore: Send + Sync + 'static {
    async fn upsert(
        &self,
        proxy_type: ProxyType,
        key: &ProxyKey,
        subscription: &DiscoverySubscription,
    ) -> Result<()>;
}

pub struct DefaultInsightStore {
    store: Arc<dyn ResourceStore>,
    max_subscriptions: usize,
}

impl DefaultInsightStore {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        max_subscriptions: usize,
    ) -> Self {
        Self {
            store,
            max_subscriptions,
        }
    }
}

#[async_trait]
impl InsightStore for DefaultInsightStore {
    async fn upsert(
        &self,
        proxy_type: ProxyType,
        key: &ProxyKey,
        subscription: &DiscoverySubscription,
    ) -> Result<()> {
        let limit = self.max_subscriptions;
        upsert(
            self.store.as_ref(),
            proxy_type.insight_kind(),
            key.to_resource_key(),
            |resource| {
                let mut insight = ProxyInsight::from_spec(&resource.spec)?;
                insight.update_subscription(subscription.clone(), limit);
                resource.spec = insight.to_spec()?;
                Ok(())
            },
        )
        .await?;
        Ok(())
    }
}
