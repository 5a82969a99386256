use std::time::SystemTime;

use serde::Deserialize;
use serde::Serialize;

use super::ProxyVersion;

/// Counters of one discovery service, or of all of them in `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryServiceStats {
    pub responses_sent: u64,
    pub responses_acknowledged: u64,
    pub responses_rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySubscriptionStatus {
    pub last_update_time: SystemTime,
    pub total: DiscoveryServiceStats,
    pub cds: DiscoveryServiceStats,
    pub eds: DiscoveryServiceStats,
    pub lds: DiscoveryServiceStats,
    pub rds: DiscoveryServiceStats,
}

impl DiscoverySubscriptionStatus {
    pub fn new(now: SystemTime) -> Self {
        Self {
            last_update_time: now,
            total: DiscoveryServiceStats::default(),
            cds: DiscoveryServiceStats::default(),
            eds: DiscoveryServiceStats::default(),
            lds: DiscoveryServiceStats::default(),
            rds: DiscoveryServiceStats::default(),
        }
    }

    /// Per-service counters for a type url. Types without a dedicated
    /// counter (secrets, runtime, ...) are only reflected in `total`.
    pub fn stats_of(
        &self,
        type_url: &str,
    ) -> Option<&DiscoveryServiceStats> {
        match short_type(type_url) {
            "Cluster" => Some(&self.cds),
            "ClusterLoadAssignment" => Some(&self.eds),
            "Listener" => Some(&self.lds),
            "RouteConfiguration" => Some(&self.rds),
            _ => None,
        }
    }

    pub fn stats_of_mut(
        &mut self,
        type_url: &str,
    ) -> Option<&mut DiscoveryServiceStats> {
        match short_type(type_url) {
            "Cluster" => Some(&mut self.cds),
            "ClusterLoadAssignment" => Some(&mut self.eds),
            "Listener" => Some(&mut self.lds),
            "RouteConfiguration" => Some(&mut self.rds),
            _ => None,
        }
    }
}

/// Last segment of a type url, e.g. `Listener` for
/// `type.googleapis.com/envoy.config.listener.v3.Listener`.
pub fn short_type(type_url: &str) -> &str {
    type_url.rsplit('.').next().unwrap_or(type_url)
}

/// Telemetry of a single discovery stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySubscription {
    pub id: String,
    pub control_plane_instance_id: String,
    pub connect_time: SystemTime,
    pub disconnect_time: Option<SystemTime>,
    pub status: DiscoverySubscriptionStatus,
    pub version: Option<ProxyVersion>,
}

impl DiscoverySubscription {
    pub fn new(
        control_plane_instance_id: impl Into<String>,
        now: SystemTime,
    ) -> Self {
        Self {
            id: nanoid::nanoid!(),
            control_plane_instance_id: control_plane_instance_id.into(),
            connect_time: now,
            disconnect_time: None,
            status: DiscoverySubscriptionStatus::new(now),
            version: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.disconnect_time.is_none()
    }

    /// Finalizes the subscription. Only the first call has an effect.
    pub fn mark_disconnected(
        &mut self,
        now: SystemTime,
    ) -> bool {
        if self.disconnect_time.is_some() {
            return false;
        }
        self.disconnect_time = Some(now);
        true
    }

    /// Accounts a request replying to an earlier response (non-empty nonce).
    pub fn record_reply(
        &mut self,
        type_url: &str,
        rejected: bool,
        now: SystemTime,
    ) {
        self.status.last_update_time = now;
        let bump = |stats: &mut DiscoveryServiceStats| {
            if rejected {
                stats.responses_rejected += 1;
            } else {
                stats.responses_acknowledged += 1;
            }
        };
        bump(&mut self.status.total);
        if let Some(stats) = self.status.stats_of_mut(type_url) {
            bump(stats);
        }
    }

    pub fn record_response(
        &mut self,
        type_url: &str,
        now: SystemTime,
    ) {
        self.status.last_update_time = now;
        self.status.total.responses_sent += 1;
        if let Some(stats) = self.status.stats_of_mut(type_url) {
            stats.responses_sent += 1;
        }
    }
}
