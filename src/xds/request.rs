use serde_json::Value;

/// Node section of a discovery request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: String,
    pub metadata: Option<Value>,
}

/// Error detail a proxy attaches when it rejects a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: i32,
    pub message: String,
}

/// Request view shared by the state-of-the-world and delta protocol variants.
///
/// Only the first request of a stream is guaranteed to carry the node.
pub trait DiscoveryRequest: Send + Sync {
    fn node_id(&self) -> &str;

    fn metadata(&self) -> Option<&Value>;

    fn response_nonce(&self) -> &str;

    fn has_errors(&self) -> bool;

    fn type_url(&self) -> &str;

    fn version_info(&self) -> &str;

    fn resource_names(&self) -> Vec<&str>;
}

pub trait DiscoveryResponse: Send + Sync {
    fn type_url(&self) -> &str;

    fn version_info(&self) -> &str;

    fn nonce(&self) -> &str;

    fn resource_count(&self) -> usize;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SotwDiscoveryRequest {
    pub node: Option<Node>,
    pub version_info: String,
    pub resource_names: Vec<String>,
    pub type_url: String,
    pub response_nonce: String,
    pub error_detail: Option<ErrorDetail>,
}

impl DiscoveryRequest for SotwDiscoveryRequest {
    fn node_id(&self) -> &str {
        self.node.as_ref().map_or("", |n| n.id.as_str())
    }

    fn metadata(&self) -> Option<&Value> {
        self.node.as_ref().and_then(|n| n.metadata.as_ref())
    }

    fn response_nonce(&self) -> &str {
        &self.response_nonce
    }

    fn has_errors(&self) -> bool {
        self.error_detail.is_some()
    }

    fn type_url(&self) -> &str {
        &self.type_url
    }

    fn version_info(&self) -> &str {
        &self.version_info
    }

    fn resource_names(&self) -> Vec<&str> {
        self.resource_names.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaDiscoveryRequest {
    pub node: Option<Node>,
    pub type_url: String,
    pub resource_names_subscribe: Vec<String>,
    pub resource_names_unsubscribe: Vec<String>,
    /// Versions the proxy already holds, keyed by resource name
    pub initial_resource_versions: Vec<(String, String)>,
    pub response_nonce: String,
    pub error_detail: Option<ErrorDetail>,
}

impl DiscoveryRequest for DeltaDiscoveryRequest {
    fn node_id(&self) -> &str {
        self.node.as_ref().map_or("", |n| n.id.as_str())
    }

    fn metadata(&self) -> Option<&Value> {
        self.node.as_ref().and_then(|n| n.metadata.as_ref())
    }

    fn response_nonce(&self) -> &str {
        &self.response_nonce
    }

    fn has_errors(&self) -> bool {
        self.error_detail.is_some()
    }

    fn type_url(&self) -> &str {
        &self.type_url
    }

    // delta requests do not carry a version
    fn version_info(&self) -> &str {
        ""
    }

    fn resource_names(&self) -> Vec<&str> {
        self.resource_names_subscribe.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SotwDiscoveryResponse {
    pub version_info: String,
    pub resources: Vec<String>,
    pub type_url: String,
    pub nonce: String,
}

impl DiscoveryResponse for SotwDiscoveryResponse {
    fn type_url(&self) -> &str {
        &self.type_url
    }

    fn version_info(&self) -> &str {
        &self.version_info
    }

    fn nonce(&self) -> &str {
        &self.nonce
    }

    fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaDiscoveryResponse {
    pub system_version_info: String,
    pub resources: Vec<String>,
    pub removed_resources: Vec<String>,
    pub type_url: String,
    pub nonce: String,
}

impl DiscoveryResponse for DeltaDiscoveryResponse {
    fn type_url(&self) -> &str {
        &self.type_url
    }

    fn version_info(&self) -> &str {
        &self.system_version_info
    }

    fn nonce(&self) -> &str {
        &self.nonce
    }

    fn resource_count(&self) -> usize {
        self.resources.len()
    }
}
