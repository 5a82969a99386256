use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parameters of the per-proxy watchdog and its lifecycle
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DataplaneConfig {
    /// Interval between two reconciliations of the same proxy
    #[serde(default = "default_refresh_interval_in_ms")]
    pub refresh_interval_in_ms: u64,

    /// Wait before deleting a self-registered proxy resource after its last
    /// stream closed. Tolerates the proxy reconnecting to another instance.
    #[serde(default = "default_deregistration_delay_in_ms")]
    pub deregistration_delay_in_ms: u64,

    /// Upper bound for waiting on workers when the registry is drained
    #[serde(default = "default_drain_timeout_in_ms")]
    pub drain_timeout_in_ms: u64,
}

impl Default for DataplaneConfig {
    fn default() -> Self {
        Self {
            refresh_interval_in_ms: default_refresh_interval_in_ms(),
            deregistration_delay_in_ms: default_deregistration_delay_in_ms(),
            drain_timeout_in_ms: default_drain_timeout_in_ms(),
        }
    }
}

impl DataplaneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_in_ms == 0 {
            return Err(Error::InvalidConfig(
                "dataplane.refresh_interval_in_ms must be greater than 0".into(),
            ));
        }
        if self.drain_timeout_in_ms == 0 {
            return Err(Error::InvalidConfig(
                "dataplane.drain_timeout_in_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_in_ms)
    }

    pub fn deregistration_delay(&self) -> Duration {
        Duration::from_millis(self.deregistration_delay_in_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_in_ms)
    }
}

fn default_refresh_interval_in_ms() -> u64 {
    1_000
}

fn default_deregistration_delay_in_ms() -> u64 {
    10_000
}

fn default_drain_timeout_in_ms() -> u64 {
    5_000
}
