use std::time::Duration;
use std::time::SystemTime;

use serde_json::Value;

use super::*;

fn subscription_at(
    cp: &str,
    offset_secs: u64,
) -> DiscoverySubscription {
    DiscoverySubscription::new(cp, SystemTime::UNIX_EPOCH + Duration::from_secs(offset_secs))
}

#[test]
fn update_should_replace_subscription_with_same_id() {
    let mut insight = ProxyInsight::default();
    let mut subscription = subscription_at("cp-1", 10);
    insight.update_subscription(subscription.clone(), 5);

    subscription.status.total.responses_sent = 3;
    insight.update_subscription(subscription.clone(), 5);

    assert_eq!(insight.subscriptions.len(), 1);
    assert_eq!(insight.last_subscription(), Some(&subscription));
}

#[test]
fn update_should_finalize_open_subscriptions_before_append() {
    let mut insight = ProxyInsight::default();
    insight.update_subscription(subscription_at("cp-1", 10), 5);
    let newer = subscription_at("cp-2", 20);

    insight.update_subscription(newer.clone(), 5);

    assert_eq!(insight.subscriptions.len(), 2);
    assert_eq!(
        insight.subscriptions[0].disconnect_time,
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(20))
    );
    assert_eq!(insight.last_subscription().unwrap().control_plane_instance_id, "cp-2");
    assert!(insight.last_subscription().unwrap().is_connected());
}

#[test]
fn update_should_cap_history() {
    let mut insight = ProxyInsight::default();
    for i in 0..5 {
        insight.update_subscription(subscription_at("cp-1", i), 2);
    }

    assert_eq!(insight.subscriptions.len(), 2);
    assert_eq!(
        insight.subscriptions[0].connect_time,
        SystemTime::UNIX_EPOCH + Duration::from_secs(3)
    );
}

#[test]
fn spec_round_trip_keeps_history() {
    let mut insight = ProxyInsight::default();
    insight.update_subscription(subscription_at("cp-1", 1), 2);

    let restored = ProxyInsight::from_spec(&insight.to_spec().unwrap()).unwrap();

    assert_eq!(restored, insight);
    assert_eq!(ProxyInsight::from_spec(&Value::Null).unwrap(), ProxyInsight::default());
}
