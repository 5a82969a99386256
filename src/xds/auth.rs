#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use super::Credential;
use crate::Resource;
use crate::Result;

/// Decides whether a credential may act on behalf of a stored proxy resource.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Returns `LifecycleError::Unauthorized` when the credential does not
    /// prove ownership of `resource`.
    async fn authenticate(
        &self,
        resource: &Resource,
        credential: &Credential,
    ) -> Result<()>;
}

/// Admits every credential. For deployments that authenticate proxies at
/// the transport layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuthenticator;

#[async_trait]
impl Authenticator for NoopAuthenticator {
    async fn authenticate(
        &self,
        _resource: &Resource,
        _credential: &Credential,
    ) -> Result<()> {
        Ok(())
    }
}
