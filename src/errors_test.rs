use tonic::Code;

use super::*;

#[test]
fn store_conflicts_include_lost_create_races() {
    let conflict = Error::from(StoreError::Conflict {
        kind: "DataplaneInsight",
        key: "default.backend".into(),
        expected: "1".into(),
        actual: "2".into(),
    });
    let exists = Error::from(StoreError::AlreadyExists {
        kind: "DataplaneInsight",
        key: "default.backend".into(),
    });
    let missing = Error::from(StoreError::NotFound {
        kind: "Dataplane",
        key: "default.backend".into(),
    });

    assert!(conflict.is_conflict());
    assert!(exists.is_conflict());
    assert!(!missing.is_conflict());
    assert!(missing.is_not_found());
}

#[test]
fn protocol_errors_map_to_invalid_argument() {
    let status: tonic::Status = Error::from(ProtocolError::InvalidNodeId {
        node_id: "no-dot".into(),
        reason: "missing mesh separator".into(),
    })
    .into();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains("no-dot"));
}

#[test]
fn lifecycle_errors_map_to_auth_codes() {
    let unauthenticated: tonic::Status =
        Error::from(LifecycleError::MissingCredential("demo.example".into())).into();
    let denied: tonic::Status = Error::from(LifecycleError::Unauthorized {
        key: "demo.example".into(),
        reason: "token mismatch".into(),
    })
    .into();

    assert_eq!(unauthenticated.code(), Code::Unauthenticated);
    assert_eq!(denied.code(), Code::PermissionDenied);
}

#[test]
fn other_errors_map_to_internal() {
    let status: tonic::Status = Error::Fatal("boom".into()).into();
    assert_eq!(status.code(), Code::Internal);
}

#[test]
fn rejected_during_shutdown_maps_to_unavailable() {
    let status: tonic::Status = Error::from(LifecycleError::Aborted("demo.example".into())).into();

    assert_eq!(status.code(), Code::Unavailable);
    assert!(status.message().contains("shutting down"));
}
