use std::fmt;
use std::sync::Arc;

use super::ResourceType;
use super::Snapshot;

type VersionMint = Arc<dyn Fn() -> String + Send + Sync>;

/// Assigns versions to the collections of a freshly generated snapshot.
///
/// A collection that already carries a version keeps it. Otherwise the
/// previous snapshot's version is reused when the `(name, content)` pairs
/// are unchanged, and a new version is minted when they are not.
#[derive(Clone)]
pub struct SnapshotAutoVersioner {
    mint: VersionMint,
}

impl Default for SnapshotAutoVersioner {
    fn default() -> Self {
        Self::new(|| nanoid::nanoid!())
    }
}

impl fmt::Debug for SnapshotAutoVersioner {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SnapshotAutoVersioner").finish_non_exhaustive()
    }
}

impl SnapshotAutoVersioner {
    pub fn new(mint: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self { mint: Arc::new(mint) }
    }

    pub fn version(
        &self,
        mut new: Snapshot,
        old: Option<&Snapshot>,
    ) -> Snapshot {
        for typ in ResourceType::ALL {
            let collection = new.collection_mut(typ);
            if !collection.version.is_empty() {
                continue;
            }

            let reused = old
                .and_then(|prev| prev.collection(typ))
                .filter(|prev| !prev.version.is_empty())
                .filter(|prev| prev.fingerprint() == collection.fingerprint())
                .map(|prev| prev.version.clone());

            collection.version = reused.unwrap_or_else(|| (self.mint)());
        }
        new
    }
}
