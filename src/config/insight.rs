use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parameters of the subscription insight sink
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InsightConfig {
    #[serde(default = "default_flush_interval_in_ms")]
    pub flush_interval_in_ms: u64,

    /// Pause after every stored flush to spread store load across proxies
    #[serde(default = "default_flush_backoff_in_ms")]
    pub flush_backoff_in_ms: u64,

    /// Number of subscriptions kept in an insight's history
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            flush_interval_in_ms: default_flush_interval_in_ms(),
            flush_backoff_in_ms: default_flush_backoff_in_ms(),
            max_subscriptions: default_max_subscriptions(),
        }
    }
}

impl InsightConfig {
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_in_ms == 0 {
            return Err(Error::InvalidConfig(
                "insight.flush_interval_in_ms must be greater than 0".into(),
            ));
        }
        if self.flush_backoff_in_ms >= self.flush_interval_in_ms {
            return Err(Error::InvalidConfig(format!(
                "insight.flush_backoff_in_ms ({}) must be lower than flush_interval_in_ms ({})",
                self.flush_backoff_in_ms, self.flush_interval_in_ms
            )));
        }
        if self.max_subscriptions == 0 {
            return Err(Error::InvalidConfig(
                "insight.max_subscriptions must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_in_ms)
    }

    pub fn flush_backoff(&self) -> Duration {
        Duration::from_millis(self.flush_backoff_in_ms)
    }
}

fn default_flush_interval_in_ms() -> u64 {
    10_000
}

fn default_flush_backoff_in_ms() -> u64 {
    500
}

fn default_max_subscriptions() -> usize {
    2
}
