use std::collections::HashMap;
use std::fmt;

use crate::constants::AUTHORIZATION_HEADER;

/// Protocol variant a stream speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XdsMode {
    Sotw,
    Delta,
}

/// Transport-assigned stream identifier.
///
/// State-of-the-world and delta servers number their streams independently,
/// so the mode is part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId {
    pub mode: XdsMode,
    pub id: i64,
}

impl StreamId {
    pub fn sotw(id: i64) -> Self {
        Self { mode: XdsMode::Sotw, id }
    }

    pub fn delta(id: i64) -> Self {
        Self { mode: XdsMode::Delta, id }
    }
}

impl fmt::Display for StreamId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.mode {
            XdsMode::Sotw => write!(f, "sotw/{}", self.id),
            XdsMode::Delta => write!(f, "delta/{}", self.id),
        }
    }
}

/// Credential presented by a proxy, e.g. a bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Transport context captured when a stream opens
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    metadata: HashMap<String, String>,
}

impl StreamContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.metadata.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn metadata(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.metadata.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Credential from the `authorization` entry, without a `Bearer ` prefix.
    pub fn credential(&self) -> Option<Credential> {
        let raw = self.metadata(AUTHORIZATION_HEADER)?.trim();
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if token.is_empty() {
            return None;
        }
        Some(Credential::new(token))
    }
}
