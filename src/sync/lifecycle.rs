//! Registration of self-describing proxies.
//!
//! A proxy may carry its own desired resource in the node metadata. The
//! resource is stored when the proxy attaches and deleted again once its last
//! stream is gone, unless the control plane is shutting down or another
//! instance has taken the proxy over in the meantime.

use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::Authenticator;
use crate::DataplaneMetadata;
use crate::DeleteOptions;
use crate::GetOptions;
use crate::LifecycleError;
use crate::ProxyInsight;
use crate::ProxyKey;
use crate::ProxyType;
use crate::Resource;
use crate::ResourceStore;
use crate::Result;
use crate::StreamContext;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LifecycleManager: Send + Sync + 'static {
    /// Stores the embedded resource of the proxy, if any.
    async fn register(
        &self,
        ctx: &StreamContext,
        metadata: &DataplaneMetadata,
    ) -> Result<()>;

    /// Removes what `register` stored. Called once, after the last stream
    /// of the proxy closed.
    async fn deregister(&self) -> Result<()>;
}

pub trait LifecycleManagerFactory: Send + Sync + 'static {
    fn new_manager(
        &self,
        key: &ProxyKey,
    ) -> Arc<dyn LifecycleManager>;
}

impl<F> LifecycleManagerFactory for F
where
    F: Fn(&ProxyKey) -> Arc<dyn LifecycleManager> + Send + Sync + 'static,
{
    fn new_manager(
        &self,
        key: &ProxyKey,
    ) -> Arc<dyn LifecycleManager> {
        self(key)
    }
}

/// Builds a [`DataplaneLifecycle`] per proxy, sharing the store and the
/// graceful-shutdown token of the control plane.
pub struct DataplaneLifecycleFactory {
    pub store: Arc<dyn ResourceStore>,
    pub authenticator: Arc<dyn Authenticator>,
    pub shutdown: CancellationToken,
    pub cp_instance_id: String,
    pub deregistration_delay: Duration,
}

impl LifecycleManagerFactory for DataplaneLifecycleFactory {
    fn new_manager(
        &self,
        key: &ProxyKey,
    ) -> Arc<dyn LifecycleManager> {
        Arc::new(DataplaneLifecycle {
            key: key.clone(),
            store: self.store.clone(),
            authenticator: self.authenticator.clone(),
            shutdown: self.shutdown.clone(),
            cp_instance_id: self.cp_instance_id.clone(),
            deregistration_delay: self.deregistration_delay,
            registered: Mutex::new(None),
        })
    }
}

pub struct DataplaneLifecycle {
    key: ProxyKey,
    store: Arc<dyn ResourceStore>,
    authenticator: Arc<dyn Authenticator>,
    shutdown: CancellationToken,
    cp_instance_id: String,
    deregistration_delay: Duration,
    /// Set once `register` stored a resource; only those are deleted.
    registered: Mutex<Option<ProxyType>>,
}

impl DataplaneLifecycle {
    /// Overwriting a registered identity requires a credential that is
    /// valid for the resource already stored.
    async fn authorize(
        &self,
        ctx: &StreamContext,
        existing: &Resource,
    ) -> Result<()> {
        let credential = ctx
            .credential()
            .ok_or_else(|| LifecycleError::MissingCredential(self.key.to_string()))?;

        self.authenticator
            .authenticate(existing, &credential)
            .await
            .map_err(|e| {
                LifecycleError::Unauthorized {
                    key: self.key.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Returns false when another instance owns the proxy by now.
    async fn owned_by_this_instance(
        &self,
        proxy_type: ProxyType,
    ) -> Result<bool> {
        let insight = match self
            .store
            .get(
                proxy_type.insight_kind(),
                GetOptions::by_key(self.key.to_resource_key()),
            )
            .await
        {
            Ok(insight) => insight,
            Err(e) if e.is_not_found() => {
                debug!(proxy = %self.key, "insight is missing, safe to deregister");
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        let insight = ProxyInsight::from_spec(&insight.spec)?;
        match insight.last_subscription() {
            Some(sub) if sub.control_plane_instance_id != self.cp_instance_id => {
                info!(
                    proxy = %self.key,
                    owner = %sub.control_plane_instance_id,
                    "proxy already connected to another instance, keeping resource"
                );
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

#[async_trait]
impl LifecycleManager for DataplaneLifecycle {
    async fn register(
        &self,
        ctx: &StreamContext,
        metadata: &DataplaneMetadata,
    ) -> Result<()> {
        let Some(desired) = &metadata.resource else {
            return Ok(());
        };
        let kind = metadata.proxy_type.resource_kind();
        let key = self.key.to_resource_key();
        info!(proxy = %self.key, %kind, "registering proxy");

        let existing = match self.store.get(kind, GetOptions::by_key(key.clone())).await {
            Ok(resource) => Some(resource),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let stored = match existing {
            Some(mut current) => {
                if !current.is_empty() {
                    self.authorize(ctx, &current).await?;
                }
                current.spec = desired.spec.clone();
                self.store.update(current).await
            }
            None => {
                self.store
                    .create(Resource::new(kind, key, desired.spec.clone()))
                    .await
            }
        };
        if let Err(e) = stored {
            info!(proxy = %self.key, "cannot register proxy: {}", e);
            return Err(e);
        }

        *self.registered.lock() = Some(metadata.proxy_type);
        Ok(())
    }

    async fn deregister(&self) -> Result<()> {
        // shutdown first: the proxy will reconnect elsewhere and needs the resource
        if self.shutdown.is_cancelled() {
            info!(proxy = %self.key, "graceful shutdown, keeping proxy resource");
            return Ok(());
        }
        let Some(proxy_type) = self.registered.lock().take() else {
            return Ok(());
        };

        info!(proxy = %self.key, delay = ?self.deregistration_delay, "waiting to deregister proxy");
        tokio::select! {
            _ = self.shutdown.cancelled() => {
                info!(proxy = %self.key, "graceful shutdown, keeping proxy resource");
                return Ok(());
            }
            _ = tokio::time::sleep(self.deregistration_delay) => {}
        }

        match self.owned_by_this_instance(proxy_type).await {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => {
                error!(proxy = %self.key, "could not check insight before deregistration: {}", e);
                return Err(e);
            }
        }

        info!(proxy = %self.key, "deregistering proxy");
        match self
            .store
            .delete(
                proxy_type.resource_kind(),
                DeleteOptions::by_key(self.key.to_resource_key()),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(proxy = %self.key, "proxy resource already deleted");
                Ok(())
            }
            Err(e) => {
                error!(proxy = %self.key, "could not deregister proxy: {}", e);
                Err(e)
            }
        }
    }
}
