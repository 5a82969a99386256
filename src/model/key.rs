use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::ProtocolError;
use crate::Result;

/// Identity of a stored resource. Global-scope resources use an empty mesh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ResourceKey {
    pub mesh: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        mesh: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            mesh: mesh.into(),
            name: name.into(),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new("", name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}", self.mesh, self.name)
    }
}

/// Identity of a logical proxy, parsed from the discovery node id
/// `"{mesh}.{name}"`.
///
/// The node id is split at the first `.` so proxy names may contain dots.
/// The mesh part is empty for global-scope proxies such as zone ingresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyKey {
    mesh: String,
    name: String,
}

impl ProxyKey {
    pub fn new(
        mesh: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            mesh: mesh.into(),
            name: name.into(),
        }
    }

    pub fn from_node_id(node_id: &str) -> Result<Self> {
        let invalid = |reason: &str| ProtocolError::InvalidNodeId {
            node_id: node_id.to_string(),
            reason: reason.to_string(),
        };

        if node_id.is_empty() {
            return Err(invalid("node id is empty").into());
        }
        let (mesh, name) = node_id
            .split_once('.')
            .ok_or_else(|| invalid("expected format {mesh}.{name}"))?;
        if name.is_empty() {
            return Err(invalid("proxy name is empty").into());
        }

        Ok(Self::new(mesh, name))
    }

    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key used for the snapshot cache entry of this proxy.
    pub fn node_hash(&self) -> String {
        self.to_string()
    }

    pub fn to_resource_key(&self) -> ResourceKey {
        ResourceKey::new(self.mesh.clone(), self.name.clone())
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}", self.mesh, self.name)
    }
}
