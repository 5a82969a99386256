use std::fmt;
use std::time::SystemTime;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::ResourceKey;

/// Whether a resource lives inside a mesh or at the top level of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Mesh,
    Global,
}

/// Resource kinds this engine reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Mesh,
    Dataplane,
    ZoneIngress,
    ZoneEgress,
    DataplaneInsight,
    ZoneIngressInsight,
    ZoneEgressInsight,
}

impl ResourceKind {
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Mesh => "Mesh",
            ResourceKind::Dataplane => "Dataplane",
            ResourceKind::ZoneIngress => "ZoneIngress",
            ResourceKind::ZoneEgress => "ZoneEgress",
            ResourceKind::DataplaneInsight => "DataplaneInsight",
            ResourceKind::ZoneIngressInsight => "ZoneIngressInsight",
            ResourceKind::ZoneEgressInsight => "ZoneEgressInsight",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            ResourceKind::Mesh,
            ResourceKind::Dataplane,
            ResourceKind::ZoneIngress,
            ResourceKind::ZoneEgress,
            ResourceKind::DataplaneInsight,
            ResourceKind::ZoneIngressInsight,
            ResourceKind::ZoneEgressInsight,
        ]
        .into_iter()
        .find(|kind| kind.name() == name)
    }

    pub fn scope(self) -> ResourceScope {
        match self {
            ResourceKind::Dataplane | ResourceKind::DataplaneInsight => ResourceScope::Mesh,
            _ => ResourceScope::Global,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub mesh: String,
    pub name: String,
    /// Opaque store version, empty until the resource is persisted
    pub version: String,
    pub creation_time: Option<SystemTime>,
    pub modification_time: Option<SystemTime>,
}

/// A declarative resource as exchanged with the store.
///
/// The spec is kept as a JSON document; typed views such as
/// [`ProxyInsight`](crate::ProxyInsight) convert from and to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub meta: ResourceMeta,
    pub spec: Value,
}

impl Resource {
    pub fn new(
        kind: ResourceKind,
        key: ResourceKey,
        spec: Value,
    ) -> Self {
        Self {
            kind,
            meta: ResourceMeta {
                mesh: key.mesh,
                name: key.name,
                version: String::new(),
                creation_time: None,
                modification_time: None,
            },
            spec,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.meta.mesh.clone(), self.meta.name.clone())
    }

    /// True when the spec carries no content at all.
    pub fn is_empty(&self) -> bool {
        match &self.spec {
            Value::Null => true,
            Value::Object(fields) => fields.is_empty(),
            _ => false,
        }
    }
}
