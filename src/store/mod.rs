//! Resource store contract consumed by the synchronization engine.
//!
//! Only the operations this crate relies on are modelled: keyed reads,
//! mesh-filtered listing, and create/update/delete guarded by optimistic
//! concurrency. [`MemoryStore`] is the in-process implementation.

mod memory;
mod upsert;
pub use memory::*;
pub use upsert::*;


#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::Resource;
use crate::ResourceKey;
use crate::ResourceKind;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOptions {
    pub key: ResourceKey,
    /// Fail with a conflict unless the stored version matches
    pub version: Option<String>,
}

impl GetOptions {
    pub fn by_key(key: ResourceKey) -> Self {
        Self { key, version: None }
    }

    pub fn by_version(
        mut self,
        version: impl Into<String>,
    ) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub mesh: Option<String>,
}

impl ListOptions {
    pub fn by_mesh(mesh: impl Into<String>) -> Self {
        Self { mesh: Some(mesh.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOptions {
    pub key: ResourceKey,
}

impl DeleteOptions {
    pub fn by_key(key: ResourceKey) -> Self {
        Self { key }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync + 'static {
    async fn get(
        &self,
        kind: ResourceKind,
        opts: GetOptions,
    ) -> Result<Resource>;

    async fn list(
        &self,
        kind: ResourceKind,
        opts: ListOptions,
    ) -> Result<Vec<Resource>>;

    /// Persists a new resource. Mesh-scoped resources require their mesh to
    /// exist. Returns the resource with its initial version.
    async fn create(
        &self,
        resource: Resource,
    ) -> Result<Resource>;

    /// Replaces a resource. The version carried by `resource` must match the
    /// stored one. Returns the resource with its new version.
    async fn update(
        &self,
        resource: Resource,
    ) -> Result<Resource>;

    async fn delete(
        &self,
        kind: ResourceKind,
        opts: DeleteOptions,
    ) -> Result<()>;
}
