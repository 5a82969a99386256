use std::sync::Arc;

use super::*;
use crate::test_utils::test_proxy;
use crate::Error;
use crate::ProxyKey;
use crate::StoreError;

fn versioner() -> SnapshotAutoVersioner {
    let next = Arc::new(std::sync::atomic::AtomicU64::new(1));
    SnapshotAutoVersioner::new(move || {
        next.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            .to_string()
    })
}

fn clusters(names: &[&str]) -> Snapshot {
    Snapshot::new().with_resources(
        ResourceType::Cluster,
        names.iter().map(|n| NamedResource::new(*n, format!("cluster {n}"))),
    )
}

#[tokio::test]
async fn reconcile_should_cache_first_snapshot() {
    let mut generator = MockSnapshotGenerator::new();
    generator
        .expect_generate_snapshot()
        .times(1)
        .returning(|_| Ok(clusters(&["localhost:8080"])));
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(generator), cache.clone(), versioner());

    let proxy = test_proxy("demo", "example");
    assert!(reconciler.reconcile(&proxy).await.unwrap());

    let cached = cache.get("demo.example").unwrap();
    assert_eq!(cached.resource_names(ResourceType::Cluster), vec!["localhost:8080"]);
}

#[tokio::test]
async fn reconcile_should_report_unchanged_for_identical_content() {
    let mut generator = MockSnapshotGenerator::new();
    generator
        .expect_generate_snapshot()
        .times(2)
        .returning(|_| Ok(clusters(&["localhost:8080"])));
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(generator), cache.clone(), versioner());
    let proxy = test_proxy("demo", "example");

    assert!(reconciler.reconcile(&proxy).await.unwrap());
    let first = cache.get("demo.example").unwrap();

    assert!(!reconciler.reconcile(&proxy).await.unwrap());
    let second = cache.get("demo.example").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn reconcile_should_only_bump_changed_type() {
    let mut generator = MockSnapshotGenerator::new();
    let mut seq = mockall::Sequence::new();
    generator
        .expect_generate_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(clusters(&["localhost:8080"])));
    generator
        .expect_generate_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(clusters(&["localhost:8080", "localhost:9090"])));
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(generator), cache.clone(), versioner());
    let proxy = test_proxy("demo", "example");

    reconciler.reconcile(&proxy).await.unwrap();
    let before = cache.get("demo.example").unwrap();
    assert!(reconciler.reconcile(&proxy).await.unwrap());
    let after = cache.get("demo.example").unwrap();

    assert_ne!(
        before.version(ResourceType::Cluster),
        after.version(ResourceType::Cluster)
    );
    for typ in ResourceType::ALL.into_iter().filter(|t| *t != ResourceType::Cluster) {
        assert_eq!(before.version(typ), after.version(typ));
    }
}

#[tokio::test]
async fn reconcile_should_cache_inconsistent_snapshot() {
    let mut generator = MockSnapshotGenerator::new();
    generator.expect_generate_snapshot().returning(|_| {
        Ok(Snapshot::new().with_resources(
            ResourceType::Cluster,
            [NamedResource::new("backend", "c").with_reference("backend")],
        ))
    });
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(generator), cache.clone(), versioner());

    assert!(reconciler.reconcile(&test_proxy("demo", "example")).await.unwrap());
    assert!(cache.get("demo.example").unwrap().consistent().is_err());
}

#[tokio::test]
async fn reconcile_should_propagate_generation_error() {
    let mut generator = MockSnapshotGenerator::new();
    generator
        .expect_generate_snapshot()
        .returning(|_| Err(StoreError::Internal("mesh unavailable".into()).into()));
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(generator), cache.clone(), versioner());

    let err = reconciler
        .reconcile(&test_proxy("demo", "example"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Internal(_))));
    assert!(!cache.has("demo.example"));
}

#[tokio::test]
async fn reconcile_after_clear_should_report_change() {
    let mut generator = MockSnapshotGenerator::new();
    generator
        .expect_generate_snapshot()
        .returning(|_| Ok(clusters(&["localhost:8080"])));
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(generator), cache.clone(), versioner());
    let proxy = test_proxy("demo", "example");

    reconciler.reconcile(&proxy).await.unwrap();
    reconciler.clear(&ProxyKey::new("demo", "example"));
    assert!(cache.get("demo.example").unwrap().is_empty());

    assert!(reconciler.reconcile(&proxy).await.unwrap());
    assert!(!cache.get("demo.example").unwrap().is_empty());
}

#[tokio::test]
async fn empty_generator_should_cache_empty_snapshot_once() {
    let cache = Arc::new(SnapshotCache::new());
    let reconciler = DefaultSnapshotReconciler::new(Arc::new(EmptySnapshotGenerator), cache.clone(), versioner());
    let proxy = test_proxy("demo", "example");

    assert!(reconciler.reconcile(&proxy).await.unwrap());
    assert!(!reconciler.reconcile(&proxy).await.unwrap());
    assert!(cache.get("demo.example").unwrap().is_empty());
}
