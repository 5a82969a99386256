use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use crate::constants::CLUSTER_TYPE_URL;
use crate::constants::ENDPOINT_TYPE_URL;
use crate::constants::LISTENER_TYPE_URL;
use crate::constants::ROUTE_TYPE_URL;
use crate::constants::RUNTIME_TYPE_URL;
use crate::constants::SECRET_TYPE_URL;
use crate::Result;
use crate::SnapshotError;

/// Discovery resource types carried in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Endpoint,
    Cluster,
    Route,
    Listener,
    Secret,
    Runtime,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Endpoint,
        ResourceType::Cluster,
        ResourceType::Route,
        ResourceType::Listener,
        ResourceType::Secret,
        ResourceType::Runtime,
    ];

    pub fn type_url(self) -> &'static str {
        match self {
            ResourceType::Endpoint => ENDPOINT_TYPE_URL,
            ResourceType::Cluster => CLUSTER_TYPE_URL,
            ResourceType::Route => ROUTE_TYPE_URL,
            ResourceType::Listener => LISTENER_TYPE_URL,
            ResourceType::Secret => SECRET_TYPE_URL,
            ResourceType::Runtime => RUNTIME_TYPE_URL,
        }
    }

    pub fn from_type_url(type_url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.type_url() == type_url)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A named, already encoded discovery resource.
///
/// `references` lists the names of dependent resources: the endpoint
/// assignments a cluster expects, or the route configurations a listener uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResource {
    pub name: String,
    pub content: Vec<u8>,
    pub references: BTreeSet<String>,
}

impl NamedResource {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            references: BTreeSet::new(),
        }
    }

    pub fn with_reference(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.references.insert(name.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCollection {
    pub version: String,
    pub items: BTreeMap<String, NamedResource>,
}

impl ResourceCollection {
    /// Content hash over the sorted `(name, content)` pairs.
    ///
    /// Lengths are hashed ahead of every field so that no two distinct
    /// collections share an input stream. References and the version are
    /// not part of the fingerprint.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.items.len() as u64).to_le_bytes());
        for (name, item) in &self.items {
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(&(item.content.len() as u64).to_le_bytes());
            hasher.update(&item.content);
        }
        hasher.finalize()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Versioned configuration of one proxy, per resource type.
///
/// Built fresh by every reconciliation and never mutated once cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    collections: BTreeMap<ResourceType, ResourceCollection>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(
        mut self,
        typ: ResourceType,
        resources: impl IntoIterator<Item = NamedResource>,
    ) -> Self {
        let collection = self.collections.entry(typ).or_default();
        for resource in resources {
            collection.items.insert(resource.name.clone(), resource);
        }
        self
    }

    pub fn with_version(
        mut self,
        typ: ResourceType,
        version: impl Into<String>,
    ) -> Self {
        self.collections.entry(typ).or_default().version = version.into();
        self
    }

    pub fn collection(
        &self,
        typ: ResourceType,
    ) -> Option<&ResourceCollection> {
        self.collections.get(&typ)
    }

    pub(crate) fn collection_mut(
        &mut self,
        typ: ResourceType,
    ) -> &mut ResourceCollection {
        self.collections.entry(typ).or_default()
    }

    /// Empty when the type is absent.
    pub fn version(
        &self,
        typ: ResourceType,
    ) -> &str {
        self.collections.get(&typ).map_or("", |c| c.version.as_str())
    }

    pub fn versions(&self) -> BTreeMap<ResourceType, String> {
        self.collections
            .iter()
            .map(|(typ, c)| (*typ, c.version.clone()))
            .collect()
    }

    pub fn resource_names(
        &self,
        typ: ResourceType,
    ) -> Vec<&str> {
        self.collections
            .get(&typ)
            .map(|c| c.items.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// True when no type holds any resource.
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(ResourceCollection::is_empty)
    }

    /// Checks that clusters and endpoints, and listeners and routes, refer
    /// to each other exactly.
    pub fn consistent(&self) -> Result<()> {
        self.check_references(ResourceType::Cluster, ResourceType::Endpoint)?;
        self.check_references(ResourceType::Listener, ResourceType::Route)?;
        Ok(())
    }

    fn check_references(
        &self,
        parent: ResourceType,
        child: ResourceType,
    ) -> Result<()> {
        let referenced: BTreeSet<&str> = self
            .collections
            .get(&parent)
            .into_iter()
            .flat_map(|c| c.items.values())
            .flat_map(|item| item.references.iter().map(String::as_str))
            .collect();
        let declared: BTreeSet<&str> = self.resource_names(child).into_iter().collect();

        if referenced.len() != declared.len() {
            return Err(SnapshotError::Inconsistent(format!(
                "{} {child} resources referenced by {parent} but {} present",
                referenced.len(),
                declared.len()
            ))
            .into());
        }
        if let Some(missing) = referenced.difference(&declared).next() {
            return Err(SnapshotError::Inconsistent(format!(
                "{child} {missing:?} referenced by {parent} is not listed"
            ))
            .into());
        }
        Ok(())
    }
}
