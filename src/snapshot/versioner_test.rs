use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::*;

fn counting_versioner() -> SnapshotAutoVersioner {
    let next = Arc::new(AtomicU64::new(100));
    SnapshotAutoVersioner::new(move || next.fetch_add(1, Ordering::SeqCst).to_string())
}

fn localhost() -> NamedResource {
    NamedResource::new("localhost:8080", "cluster localhost:8080")
}

fn previous() -> Snapshot {
    let mut snapshot = Snapshot::new().with_resources(ResourceType::Cluster, [localhost()]);
    for typ in ResourceType::ALL {
        snapshot = snapshot.with_version(typ, "1");
    }
    snapshot
}

#[test]
fn version_should_mint_for_every_type_without_previous() {
    let versioner = counting_versioner();

    let versioned = versioner.version(
        Snapshot::new().with_resources(ResourceType::Cluster, [localhost()]),
        None,
    );

    for typ in ResourceType::ALL {
        assert!(!versioned.version(typ).is_empty(), "{typ} has no version");
    }
}

#[test]
fn version_should_be_reused_for_identical_content() {
    let versioner = counting_versioner();
    let old = previous();

    let versioned = versioner.version(
        Snapshot::new().with_resources(ResourceType::Cluster, [localhost()]),
        Some(&old),
    );

    assert_eq!(versioned.version(ResourceType::Cluster), "1");
    assert_eq!(versioned.versions(), old.versions());
}

#[test]
fn version_should_change_only_for_changed_type() {
    let versioner = counting_versioner();
    let old = previous();

    let versioned = versioner.version(
        Snapshot::new().with_resources(
            ResourceType::Cluster,
            [localhost(), NamedResource::new("localhost:9090", "cluster localhost:9090")],
        ),
        Some(&old),
    );

    assert_eq!(versioned.version(ResourceType::Cluster), "100");
    for typ in ResourceType::ALL.into_iter().filter(|t| *t != ResourceType::Cluster) {
        assert_eq!(versioned.version(typ), "1", "{typ} should keep its version");
    }
}

#[test]
fn version_should_keep_explicit_versions() {
    let versioner = counting_versioner();

    let versioned = versioner.version(
        Snapshot::new()
            .with_resources(ResourceType::Cluster, [localhost()])
            .with_version(ResourceType::Cluster, "pinned"),
        Some(&previous()),
    );

    assert_eq!(versioned.version(ResourceType::Cluster), "pinned");
}

#[test]
fn version_should_not_reuse_empty_previous_version() {
    let versioner = counting_versioner();
    let old = Snapshot::new().with_resources(ResourceType::Cluster, [localhost()]);

    let versioned = versioner.version(
        Snapshot::new().with_resources(ResourceType::Cluster, [localhost()]),
        Some(&old),
    );

    assert_ne!(versioned.version(ResourceType::Cluster), "");
}

#[test]
fn cleared_snapshot_should_not_donate_versions() {
    let versioner = counting_versioner();

    let versioned = versioner.version(Snapshot::new(), Some(&Snapshot::new()));

    for typ in ResourceType::ALL {
        assert!(!versioned.version(typ).is_empty());
    }
}
