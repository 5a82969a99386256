use std::time::SystemTime;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tonic::async_trait;
use tracing::trace;

use super::DeleteOptions;
use super::GetOptions;
use super::ListOptions;
use super::ResourceStore;
use crate::Resource;
use crate::ResourceKey;
use crate::ResourceKind;
use crate::ResourceScope;
use crate::Result;
use crate::StoreError;

type RecordKey = (ResourceKind, ResourceKey);

/// In-memory resource store with per-record optimistic versioning.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<RecordKey, Resource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn not_found(
        kind: ResourceKind,
        key: &ResourceKey,
    ) -> StoreError {
        StoreError::NotFound {
            kind: kind.name(),
            key: key.to_string(),
        }
    }

    fn check_owner(
        &self,
        resource: &Resource,
    ) -> Result<()> {
        if resource.kind.scope() != ResourceScope::Mesh {
            return Ok(());
        }
        if resource.meta.mesh.is_empty() {
            return Err(StoreError::Invalid(format!(
                "{} {} must belong to a mesh",
                resource.kind,
                resource.key()
            ))
            .into());
        }
        let mesh_key = (ResourceKind::Mesh, ResourceKey::global(resource.meta.mesh.clone()));
        if !self.records.contains_key(&mesh_key) {
            return Err(Self::not_found(ResourceKind::Mesh, &mesh_key.1).into());
        }
        Ok(())
    }
}

fn next_version(current: &str) -> String {
    current.parse::<u64>().map(|v| v + 1).unwrap_or(1).to_string()
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(
        &self,
        kind: ResourceKind,
        opts: GetOptions,
    ) -> Result<Resource> {
        let record = self
            .records
            .get(&(kind, opts.key.clone()))
            .ok_or_else(|| Self::not_found(kind, &opts.key))?;

        if let Some(expected) = &opts.version {
            if *expected != record.meta.version {
                return Err(StoreError::Conflict {
                    kind: kind.name(),
                    key: opts.key.to_string(),
                    expected: expected.clone(),
                    actual: record.meta.version.clone(),
                }
                .into());
            }
        }
        Ok(record.value().clone())
    }

    async fn list(
        &self,
        kind: ResourceKind,
        opts: ListOptions,
    ) -> Result<Vec<Resource>> {
        let mut items: Vec<Resource> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .filter(|entry| opts.mesh.as_ref().map_or(true, |mesh| entry.value().meta.mesh == *mesh))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(items)
    }

    async fn create(
        &self,
        mut resource: Resource,
    ) -> Result<Resource> {
        self.check_owner(&resource)?;

        let key = resource.key();
        match self.records.entry((resource.kind, key.clone())) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                kind: resource.kind.name(),
                key: key.to_string(),
            }
            .into()),
            Entry::Vacant(slot) => {
                let now = SystemTime::now();
                resource.meta.version = next_version("");
                resource.meta.creation_time = Some(now);
                resource.meta.modification_time = Some(now);
                trace!(kind = %resource.kind, key = %key, "created");
                slot.insert(resource.clone());
                Ok(resource)
            }
        }
    }

    async fn update(
        &self,
        mut resource: Resource,
    ) -> Result<Resource> {
        let key = resource.key();
        let mut record = self
            .records
            .get_mut(&(resource.kind, key.clone()))
            .ok_or_else(|| Self::not_found(resource.kind, &key))?;

        if record.meta.version != resource.meta.version {
            return Err(StoreError::Conflict {
                kind: resource.kind.name(),
                key: key.to_string(),
                expected: resource.meta.version.clone(),
                actual: record.meta.version.clone(),
            }
            .into());
        }

        resource.meta.version = next_version(&record.meta.version);
        resource.meta.creation_time = record.meta.creation_time;
        resource.meta.modification_time = Some(SystemTime::now());
        *record = resource.clone();
        trace!(kind = %resource.kind, key = %key, version = %resource.meta.version, "updated");
        Ok(resource)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        opts: DeleteOptions,
    ) -> Result<()> {
        self.records
            .remove(&(kind, opts.key.clone()))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(kind, &opts.key).into())
    }
}
