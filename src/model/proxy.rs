use std::sync::Arc;

use super::DataplaneMetadata;
use super::ProxyKey;
use super::Resource;

/// Everything a snapshot generator needs to know about a proxy for one
/// reconciliation.
#[derive(Debug, Clone)]
pub struct Proxy {
    pub key: ProxyKey,
    /// The stored resource describing the proxy
    pub resource: Resource,
    pub metadata: Arc<DataplaneMetadata>,
}

impl Proxy {
    pub fn node_hash(&self) -> String {
        self.key.node_hash()
    }
}
