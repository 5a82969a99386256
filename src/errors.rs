//! Control Plane Synchronization Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: discovery protocol
//! handling, the resource store, proxy lifecycle management, snapshot
//! generation and configuration.

use config::ConfigError;

use crate::StreamId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed discovery requests and stream bookkeeping violations
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Failures reported by the resource store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Proxy registration and deregistration failures
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Snapshot generation and consistency failures
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Configuration source could not be loaded or parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but rejected by validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Signal sender closed: {0}")]
    SignalSenderClosed(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Stream ids must never be reused while the stream is open
    #[error("stream {0} is already registered")]
    DuplicateStream(StreamId),

    #[error("stream {0} is not registered")]
    UnknownStream(StreamId),

    /// Node id is not of the form `{mesh}.{name}`
    #[error("invalid node id {node_id:?}: {reason}")]
    InvalidNodeId { node_id: String, reason: String },

    /// Node metadata could not be interpreted
    #[error("invalid node metadata: {0}")]
    InvalidMetadata(String),

    /// Embedded resource claims an identity other than the node id
    #[error("proxy {expected} carries a resource for {actual}")]
    IdentityMismatch { expected: String, actual: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    /// Optimistic concurrency check failed
    #[error("{kind} {key} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        kind: &'static str,
        key: String,
        expected: String,
        actual: String,
    },

    #[error("invalid resource: {0}")]
    Invalid(String),

    #[error("store failure: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Stream carries no credential but the existing resource requires one
    #[error("no credential presented for {0}")]
    MissingCredential(String),

    /// Credential was rejected for an already registered identity
    #[error("proxy {key} is not allowed to override the existing resource: {reason}")]
    Unauthorized { key: String, reason: String },

    /// The registry is draining and accepts no new proxies
    #[error("proxy {0} rejected: control plane is shutting down")]
    Aborted(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Cross references between resource types do not resolve
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Another writer won the race; the write can be retried later.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::AlreadyExists { .. })
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_not_found())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_conflict())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(StoreError::Invalid(e.to_string()))
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Protocol(e) => tonic::Status::invalid_argument(e.to_string()),
            Error::Lifecycle(e @ LifecycleError::MissingCredential(_)) => {
                tonic::Status::unauthenticated(e.to_string())
            }
            Error::Lifecycle(e @ LifecycleError::Unauthorized { .. }) => {
                tonic::Status::permission_denied(e.to_string())
            }
            Error::Lifecycle(e @ LifecycleError::Aborted(_)) => tonic::Status::unavailable(e.to_string()),
            Error::Store(e) if e.is_conflict() => tonic::Status::aborted(e.to_string()),
            Error::Store(e) if e.is_not_found() => tonic::Status::not_found(e.to_string()),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}
