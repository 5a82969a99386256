use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::ProxyKey;
use super::ProxyType;
use super::Resource;
use super::ResourceKey;
use super::ResourceKind;
use crate::constants::METADATA_ADMIN_PORT;
use crate::constants::METADATA_PROXY_TYPE;
use crate::constants::METADATA_RESOURCE;
use crate::constants::METADATA_TOKEN_PATH;
use crate::constants::METADATA_VERSION;
use crate::Error;
use crate::ProtocolError;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentVersion {
    pub version: String,
    pub git_tag: String,
    pub git_commit: String,
    pub build_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvoyVersion {
    pub version: String,
    pub build: String,
}

/// Versions reported by the proxy in its node metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyVersion {
    pub kuma_dp: AgentVersion,
    pub envoy: EnvoyVersion,
}

/// Per-request view of the node metadata.
///
/// Absent metadata yields the defaults (a dataplane without an embedded
/// resource). Present but malformed fields are rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataplaneMetadata {
    pub proxy_type: ProxyType,
    /// Desired state of a self-registering proxy
    pub resource: Option<Resource>,
    pub token_path: Option<String>,
    pub admin_port: Option<u32>,
    pub version: Option<ProxyVersion>,
}

impl DataplaneMetadata {
    pub fn from_node_metadata(metadata: Option<&Value>) -> Result<Self> {
        let fields = match metadata {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(fields)) => fields,
            Some(other) => return Err(invalid(format!("expected an object, got {other}"))),
        };

        let proxy_type = match fields.get(METADATA_PROXY_TYPE) {
            None => ProxyType::default(),
            Some(Value::String(s)) if s.is_empty() => ProxyType::default(),
            Some(Value::String(s)) => s.parse::<ProxyType>()?,
            Some(other) => return Err(invalid(format!("{METADATA_PROXY_TYPE} must be a string, got {other}"))),
        };

        let resource = fields
            .get(METADATA_RESOURCE)
            .map(|value| parse_embedded_resource(value, proxy_type))
            .transpose()?;

        let token_path = match fields.get(METADATA_TOKEN_PATH) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => return Err(invalid(format!("{METADATA_TOKEN_PATH} must be a string, got {other}"))),
        };

        let admin_port = fields.get(METADATA_ADMIN_PORT).map(parse_port).transpose()?;

        let version = fields
            .get(METADATA_VERSION)
            .map(|v| {
                serde_json::from_value::<ProxyVersion>(v.clone())
                    .map_err(|e| invalid(format!("{METADATA_VERSION}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            proxy_type,
            resource,
            token_path,
            admin_port,
            version,
        })
    }

    /// Rejects an embedded resource whose identity differs from the node id.
    pub fn validate_identity(
        &self,
        key: &ProxyKey,
    ) -> Result<()> {
        if let Some(resource) = &self.resource {
            let expected = key.to_resource_key();
            let actual = resource.key();
            if expected != actual {
                return Err(ProtocolError::IdentityMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> Error {
    ProtocolError::InvalidMetadata(message).into()
}

fn parse_port(value: &Value) -> Result<u32> {
    let port = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    port.filter(|p| *p <= u16::MAX as u64)
        .map(|p| p as u32)
        .ok_or_else(|| invalid(format!("{METADATA_ADMIN_PORT} is not a valid port: {value}")))
}

/// The embedded resource travels either as a JSON document serialized into a
/// string or as a nested object:
/// `{"type": "Dataplane", "mesh": "demo", "name": "example", "networking": {..}}`
fn parse_embedded_resource(
    value: &Value,
    proxy_type: ProxyType,
) -> Result<Resource> {
    let document: Map<String, Value> = match value {
        Value::String(raw) => serde_json::from_str(raw)
            .map_err(|e| invalid(format!("{METADATA_RESOURCE} is not a JSON object: {e}")))?,
        Value::Object(fields) => fields.clone(),
        other => return Err(invalid(format!("{METADATA_RESOURCE} must be a JSON object, got {other}"))),
    };

    let mut spec = document;
    let kind_name = take_string(&mut spec, "type")?
        .ok_or_else(|| invalid(format!("{METADATA_RESOURCE} has no type")))?;
    let kind = ResourceKind::from_name(&kind_name)
        .ok_or_else(|| invalid(format!("{METADATA_RESOURCE} has unknown type {kind_name:?}")))?;
    if kind != proxy_type.resource_kind() {
        return Err(invalid(format!(
            "{METADATA_RESOURCE} of type {kind} does not match proxy type {proxy_type}"
        )));
    }
    let mesh = take_string(&mut spec, "mesh")?.unwrap_or_default();
    let name = take_string(&mut spec, "name")?
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(format!("{METADATA_RESOURCE} has no name")))?;

    Ok(Resource::new(kind, ResourceKey::new(mesh, name), Value::Object(spec)))
}

fn take_string(
    fields: &mut Map<String, Value>,
    field: &str,
) -> Result<Option<String>> {
    match fields.remove(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(invalid(format!("{METADATA_RESOURCE}.{field} must be a string, got {other}"))),
    }
}
