use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::ResourceKind;
use super::ResourceScope;
use crate::ProtocolError;

/// Kind of proxy attached to the control plane.
///
/// The set is closed; every per-kind difference is answered by the
/// capability table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProxyType {
    #[default]
    Dataplane,
    Ingress,
    Egress,
}

struct Capabilities {
    name: &'static str,
    resource: ResourceKind,
    insight: ResourceKind,
}

const DATAPLANE: Capabilities = Capabilities {
    name: "dataplane",
    resource: ResourceKind::Dataplane,
    insight: ResourceKind::DataplaneInsight,
};

const INGRESS: Capabilities = Capabilities {
    name: "ingress",
    resource: ResourceKind::ZoneIngress,
    insight: ResourceKind::ZoneIngressInsight,
};

const EGRESS: Capabilities = Capabilities {
    name: "egress",
    resource: ResourceKind::ZoneEgress,
    insight: ResourceKind::ZoneEgressInsight,
};

impl ProxyType {
    fn capabilities(self) -> &'static Capabilities {
        match self {
            ProxyType::Dataplane => &DATAPLANE,
            ProxyType::Ingress => &INGRESS,
            ProxyType::Egress => &EGRESS,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.capabilities().name
    }

    /// Kind of the resource describing the proxy itself
    pub fn resource_kind(self) -> ResourceKind {
        self.capabilities().resource
    }

    /// Kind of the resource holding the proxy's subscription history
    pub fn insight_kind(self) -> ResourceKind {
        self.capabilities().insight
    }

    pub fn is_mesh_scoped(self) -> bool {
        self.resource_kind().scope() == ResourceScope::Mesh
    }
}

impl FromStr for ProxyType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [ProxyType::Dataplane, ProxyType::Ingress, ProxyType::Egress]
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidMetadata(format!("unknown proxy type {s:?}")))
    }
}

impl fmt::Display for ProxyType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
