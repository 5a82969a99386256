// -
// Node metadata fields

/// Proxy kind announced by the proxy: `dataplane`, `ingress` or `egress`
pub const METADATA_PROXY_TYPE: &str = "dataplane.proxyType";
/// JSON document of the proxy's own desired-state resource
pub const METADATA_RESOURCE: &str = "dataplane.resource";
pub const METADATA_TOKEN_PATH: &str = "dataplane.token.path";
pub const METADATA_ADMIN_PORT: &str = "dataplane.admin.port";
pub const METADATA_VERSION: &str = "version";

/// Stream context key holding the proxy credential
pub const AUTHORIZATION_HEADER: &str = "authorization";

// -
// Discovery type urls

pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub const ENDPOINT_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";
pub const SECRET_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.Secret";
pub const RUNTIME_TYPE_URL: &str = "type.googleapis.com/envoy.service.runtime.v3.Runtime";
