use std::sync::Arc;

use serde_json::json;
use serde_json::Value;

use crate::constants::METADATA_ADMIN_PORT;
use crate::constants::METADATA_RESOURCE;
use crate::DataplaneMetadata;
use crate::ErrorDetail;
use crate::Node;
use crate::Proxy;
use crate::ProxyKey;
use crate::Resource;
use crate::ResourceKey;
use crate::ResourceKind;
use crate::ResourceStore;
use crate::SotwDiscoveryRequest;
use crate::SotwDiscoveryResponse;

pub async fn create_mesh(
    store: &dyn ResourceStore,
    name: &str,
) -> Resource {
    store
        .create(Resource::new(ResourceKind::Mesh, ResourceKey::global(name), json!({})))
        .await
        .unwrap()
}

pub fn dataplane_spec() -> Value {
    json!({
        "networking": {
            "address": "192.168.0.1",
            "inbound": [{ "port": 8080, "tags": { "kuma.io/service": "backend" } }]
        }
    })
}

pub fn dataplane_resource(
    mesh: &str,
    name: &str,
) -> Resource {
    Resource::new(ResourceKind::Dataplane, ResourceKey::new(mesh, name), dataplane_spec())
}

/// Node metadata of a proxy carrying its own dataplane resource.
pub fn self_registering_metadata(
    mesh: &str,
    name: &str,
) -> Value {
    let mut document = dataplane_spec();
    document["type"] = json!("Dataplane");
    document["mesh"] = json!(mesh);
    document["name"] = json!(name);
    json!({
        METADATA_RESOURCE: document.to_string(),
        METADATA_ADMIN_PORT: 9901,
    })
}

pub fn test_proxy(
    mesh: &str,
    name: &str,
) -> Proxy {
    Proxy {
        key: ProxyKey::new(mesh, name),
        resource: dataplane_resource(mesh, name),
        metadata: Arc::new(DataplaneMetadata::default()),
    }
}

pub fn discovery_request(
    node_id: &str,
    metadata: Option<Value>,
) -> SotwDiscoveryRequest {
    SotwDiscoveryRequest {
        node: Some(Node {
            id: node_id.to_string(),
            metadata,
        }),
        ..Default::default()
    }
}

/// Follow-up request replying to the response with `nonce`.
pub fn reply(
    type_url: &str,
    nonce: &str,
    rejected: bool,
) -> SotwDiscoveryRequest {
    SotwDiscoveryRequest {
        type_url: type_url.to_string(),
        response_nonce: nonce.to_string(),
        error_detail: rejected.then(|| ErrorDetail {
            code: 13,
            message: "rejected by proxy".to_string(),
        }),
        ..Default::default()
    }
}

pub fn response(
    type_url: &str,
    nonce: &str,
) -> SotwDiscoveryResponse {
    SotwDiscoveryResponse {
        version_info: "1".to_string(),
        resources: vec!["resource".to_string()],
        type_url: type_url.to_string(),
        nonce: nonce.to_string(),
    }
}
