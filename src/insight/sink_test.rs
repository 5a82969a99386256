use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use super::*;
use crate::constants::CLUSTER_TYPE_URL;
use crate::DiscoverySubscription;
use crate::ProxyKey;
use crate::ProxyType;
use crate::StoreError;

const INTERVAL: Duration = Duration::from_secs(10);
const BACKOFF: Duration = Duration::from_millis(500);

struct FakeAccessor {
    status: Mutex<Option<SubscriptionStatus>>,
}

impl FakeAccessor {
    fn resolved() -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(Some(SubscriptionStatus {
                key: ProxyKey::new("default", "example-001"),
                proxy_type: ProxyType::Dataplane,
                subscription: DiscoverySubscription::new("cp-1", SystemTime::now()),
            })),
        })
    }

    fn touch(&self) {
        if let Some(status) = self.status.lock().as_mut() {
            status
                .subscription
                .record_response(CLUSTER_TYPE_URL, SystemTime::now());
        }
    }
}

impl SubscriptionStatusAccessor for FakeAccessor {
    fn get_status(&self) -> Option<SubscriptionStatus> {
        self.status.lock().clone()
    }
}

fn conflict() -> crate::Error {
    StoreError::Conflict {
        kind: "DataplaneInsight",
        key: "default.example-001".into(),
        expected: "1".into(),
        actual: "2".into(),
    }
    .into()
}

async fn run_sink(
    accessor: Arc<FakeAccessor>,
    store: MockInsightStore,
    run_for: Duration,
) {
    let stop = CancellationToken::new();
    let sink = InsightSink::new(accessor, Arc::new(store), INTERVAL, BACKOFF);
    tokio::join!(sink.start(stop.clone()), async {
        tokio::time::sleep(run_for).await;
        stop.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn unchanged_status_should_be_stored_once() {
    let mut store = MockInsightStore::new();
    store.expect_upsert().times(1).returning(|_, _, _| Ok(()));

    run_sink(FakeAccessor::resolved(), store, INTERVAL * 3 + INTERVAL / 2).await;
}

#[tokio::test(start_paused = true)]
async fn changed_status_should_be_stored_on_next_tick() {
    let mut store = MockInsightStore::new();
    store
        .expect_upsert()
        .times(2)
        .withf(|proxy_type, key, _| *proxy_type == ProxyType::Dataplane && key.name() == "example-001")
        .returning(|_, _, _| Ok(()));
    let accessor = FakeAccessor::resolved();

    let stop = CancellationToken::new();
    let sink = InsightSink::new(accessor.clone(), Arc::new(store), INTERVAL, BACKOFF);
    let worker = tokio::spawn(sink.start(stop.clone()));
    tokio::time::sleep(INTERVAL / 2).await;
    accessor.touch();
    tokio::time::sleep(INTERVAL).await;
    stop.cancel();
    worker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unresolved_stream_should_not_be_stored() {
    let mut store = MockInsightStore::new();
    store.expect_upsert().never();
    let accessor = Arc::new(FakeAccessor {
        status: Mutex::new(None),
    });

    run_sink(accessor, store, INTERVAL * 2).await;
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn conflict_should_be_retried_next_tick() {
    let mut store = MockInsightStore::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_upsert()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(conflict()));
    store
        .expect_upsert()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));

    run_sink(FakeAccessor::resolved(), store, INTERVAL * 2 + INTERVAL / 2).await;

    assert!(logs_contain("retrying next tick"));
    assert!(!logs_contain("could not store subscription status"));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn store_failure_should_be_logged_as_error() {
    let mut store = MockInsightStore::new();
    store
        .expect_upsert()
        .returning(|_, _, _| Err(StoreError::Internal("connection reset".into()).into()));

    run_sink(FakeAccessor::resolved(), store, INTERVAL / 2).await;

    assert!(logs_contain("could not store subscription status"));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn final_flush_failure_should_be_downgraded() {
    let mut store = MockInsightStore::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_upsert()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));
    store
        .expect_upsert()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(StoreError::Internal("proxy deleted".into()).into()));
    let accessor = FakeAccessor::resolved();

    let stop = CancellationToken::new();
    let sink = InsightSink::new(accessor.clone(), Arc::new(store), INTERVAL, BACKOFF);
    tokio::join!(sink.start(stop.clone()), async {
        tokio::time::sleep(INTERVAL / 2).await;
        accessor.touch();
        stop.cancel();
    });

    assert!(logs_contain("final flush failed"));
    assert!(!logs_contain("could not store subscription status"));
}
