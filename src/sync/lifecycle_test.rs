use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::test_utils::create_mesh;
use crate::test_utils::dataplane_resource;
use crate::test_utils::self_registering_metadata;
use crate::Authenticator;
use crate::DataplaneMetadata;
use crate::DiscoverySubscription;
use crate::Error;
use crate::GetOptions;
use crate::LifecycleError;
use crate::MemoryStore;
use crate::MockAuthenticator;
use crate::NoopAuthenticator;
use crate::ProxyInsight;
use crate::ProxyKey;
use crate::Resource;
use crate::ResourceKind;
use crate::ResourceStore;
use crate::StoreError;
use crate::StreamContext;

const DELAY: Duration = Duration::from_secs(10);

struct Fixture {
    store: Arc<MemoryStore>,
    shutdown: CancellationToken,
    lifecycle: Arc<dyn LifecycleManager>,
}

async fn fixture(authenticator: Arc<dyn Authenticator>) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    create_mesh(store.as_ref(), "demo").await;
    let shutdown = CancellationToken::new();
    let factory = DataplaneLifecycleFactory {
        store: store.clone(),
        authenticator,
        shutdown: shutdown.clone(),
        cp_instance_id: "cp-1".to_string(),
        deregistration_delay: DELAY,
    };
    let lifecycle = factory.new_manager(&ProxyKey::new("demo", "example"));
    Fixture {
        store,
        shutdown,
        lifecycle,
    }
}

fn embedded_metadata() -> DataplaneMetadata {
    DataplaneMetadata::from_node_metadata(Some(&self_registering_metadata("demo", "example"))).unwrap()
}

async fn stored_dataplane(store: &MemoryStore) -> Option<Resource> {
    match store
        .get(
            ResourceKind::Dataplane,
            GetOptions::by_key(ProxyKey::new("demo", "example").to_resource_key()),
        )
        .await
    {
        Ok(resource) => Some(resource),
        Err(e) if e.is_not_found() => None,
        Err(e) => panic!("unexpected store error: {e:?}"),
    }
}

async fn write_insight(
    store: &MemoryStore,
    cp_instance_id: &str,
) {
    let insight = ProxyInsight {
        subscriptions: vec![DiscoverySubscription::new(cp_instance_id, SystemTime::now())],
    };
    store
        .create(Resource::new(
            ResourceKind::DataplaneInsight,
            ProxyKey::new("demo", "example").to_resource_key(),
            insight.to_spec().unwrap(),
        ))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn register_without_embedded_resource_is_noop() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;

    f.lifecycle
        .register(&StreamContext::new(), &DataplaneMetadata::default())
        .await
        .unwrap();
    f.lifecycle.deregister().await.unwrap();

    assert_eq!(f.store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn register_then_deregister_should_delete_resource() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;

    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();
    let stored = stored_dataplane(&f.store).await.unwrap();
    assert_eq!(stored.spec["networking"]["address"], "192.168.0.1");

    let started = tokio::time::Instant::now();
    f.lifecycle.deregister().await.unwrap();

    assert!(started.elapsed() >= DELAY);
    assert!(stored_dataplane(&f.store).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn deregister_should_only_delete_once() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;
    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();

    f.lifecycle.deregister().await.unwrap();
    f.store.create(dataplane_resource("demo", "example")).await.unwrap();
    f.lifecycle.deregister().await.unwrap();

    assert!(stored_dataplane(&f.store).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn overriding_existing_resource_requires_credential() {
    let mut authenticator = MockAuthenticator::new();
    authenticator.expect_authenticate().never();
    let f = fixture(Arc::new(authenticator)).await;
    f.store.create(dataplane_resource("demo", "example")).await.unwrap();

    let err = f
        .lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Lifecycle(LifecycleError::MissingCredential(_))));
}

#[tokio::test(start_paused = true)]
async fn overriding_existing_resource_checks_credential_against_it() {
    let mut authenticator = MockAuthenticator::new();
    authenticator
        .expect_authenticate()
        .times(1)
        .withf(|resource, credential| {
            resource.meta.version == "1" && credential.as_str() == "stolen-token"
        })
        .returning(|_, _| Err(StoreError::Invalid("token bound to another proxy".into()).into()));
    let f = fixture(Arc::new(authenticator)).await;
    let mut existing = dataplane_resource("demo", "example");
    existing.spec["networking"]["address"] = "10.0.0.7".into();
    f.store.create(existing).await.unwrap();

    let ctx = StreamContext::new().with_metadata("Authorization", "Bearer stolen-token");
    let err = f
        .lifecycle
        .register(&ctx, &embedded_metadata())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Lifecycle(LifecycleError::Unauthorized { .. })));
    let stored = stored_dataplane(&f.store).await.unwrap();
    assert_eq!(stored.spec["networking"]["address"], "10.0.0.7");
}

#[tokio::test(start_paused = true)]
async fn authorized_override_should_replace_spec() {
    let mut authenticator = MockAuthenticator::new();
    authenticator
        .expect_authenticate()
        .times(1)
        .returning(|_, _| Ok(()));
    let f = fixture(Arc::new(authenticator)).await;
    let mut existing = dataplane_resource("demo", "example");
    existing.spec["networking"]["address"] = "10.0.0.7".into();
    f.store.create(existing).await.unwrap();

    let ctx = StreamContext::new().with_metadata("authorization", "token");
    f.lifecycle.register(&ctx, &embedded_metadata()).await.unwrap();

    let stored = stored_dataplane(&f.store).await.unwrap();
    assert_eq!(stored.spec["networking"]["address"], "192.168.0.1");
    assert_eq!(stored.meta.version, "2");
}

#[tokio::test(start_paused = true)]
async fn empty_existing_resource_needs_no_credential() {
    let mut authenticator = MockAuthenticator::new();
    authenticator.expect_authenticate().never();
    let f = fixture(Arc::new(authenticator)).await;
    f.store
        .create(Resource::new(
            ResourceKind::Dataplane,
            ProxyKey::new("demo", "example").to_resource_key(),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();

    assert!(!stored_dataplane(&f.store).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_delay_should_keep_resource() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;
    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();

    let lifecycle = f.lifecycle.clone();
    let deregistration = tokio::spawn(async move { lifecycle.deregister().await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    f.shutdown.cancel();
    deregistration.await.unwrap().unwrap();

    assert!(stored_dataplane(&f.store).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_deregistration_should_keep_resource() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;
    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();

    f.shutdown.cancel();
    f.lifecycle.deregister().await.unwrap();

    assert!(stored_dataplane(&f.store).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn reconnect_to_other_instance_should_keep_resource() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;
    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();

    let lifecycle = f.lifecycle.clone();
    let deregistration = tokio::spawn(async move { lifecycle.deregister().await });
    tokio::time::sleep(DELAY / 2).await;
    write_insight(&f.store, "cp-2").await;
    deregistration.await.unwrap().unwrap();

    assert!(stored_dataplane(&f.store).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn insight_owned_by_this_instance_should_not_block_deletion() {
    let f = fixture(Arc::new(NoopAuthenticator)).await;
    f.lifecycle
        .register(&StreamContext::new(), &embedded_metadata())
        .await
        .unwrap();
    write_insight(&f.store, "cp-1").await;

    f.lifecycle.deregister().await.unwrap();

    assert!(stored_dataplane(&f.store).await.is_none());
}
