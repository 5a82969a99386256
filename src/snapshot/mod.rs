//! Per-proxy configuration snapshots.
//!
//! ## Version reuse
//! The discovery protocol pushes new configuration only when a version
//! changes. [`SnapshotAutoVersioner`] keeps the previous version of a
//! resource type as long as its named content is identical, so that
//! unchanged configuration never reaches the proxy twice.
//!
//! ## Cache
//! [`SnapshotCache`] is the hand-off point to the discovery server, keyed by
//! node hash (`"{mesh}.{name}"`).

mod cache;
mod reconciler;
mod types;
mod versioner;

pub use cache::*;
pub use reconciler::*;
pub use types::*;
pub use versioner::*;

#[cfg(test)]
mod reconciler_test;
#[cfg(test)]
mod versioner_test;
