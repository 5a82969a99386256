use serde_json::Value;

use super::GetOptions;
use super::ResourceStore;
use crate::Resource;
use crate::ResourceKey;
use crate::ResourceKind;
use crate::Result;

/// Get-or-create `key`, apply `mutate` and write it back.
///
/// The write is not retried: a concurrent writer surfaces as a conflict
/// (or `AlreadyExists` when both raced to create) for the caller to handle.
pub async fn upsert<F>(
    store: &dyn ResourceStore,
    kind: ResourceKind,
    key: ResourceKey,
    mutate: F,
) -> Result<Resource>
where
    F: FnOnce(&mut Resource) -> Result<()> + Send,
{
    match store.get(kind, GetOptions::by_key(key.clone())).await {
        Ok(mut existing) => {
            mutate(&mut existing)?;
            store.update(existing).await
        }
        Err(e) if e.is_not_found() => {
            let mut fresh = Resource::new(kind, key, Value::Null);
            mutate(&mut fresh)?;
            store.create(fresh).await
        }
        Err(e) => Err(e),
    }
}
