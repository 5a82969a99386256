//! Configuration management for the synchronization engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod dataplane;
mod insight;
mod monitoring;
mod runtime;
pub use dataplane::*;
pub use insight::*;
pub use monitoring::*;
pub use runtime::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix, e.g. `XDS__DATAPLANE__REFRESH_INTERVAL_IN_MS`
const ENV_PREFIX: &str = "XDS";

/// Root configuration of a control plane instance
///
/// Sources are merged in the following order (later sources override earlier):
/// 1. Default values from code
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct XdsSyncConfig {
    /// Identity and local paths of this instance
    pub runtime: RuntimeConfig,
    /// Proxy watchdog and lifecycle parameters
    pub dataplane: DataplaneConfig,
    /// Subscription insight flushing parameters
    pub insight: InsightConfig,
    /// Metrics exposition
    pub monitoring: MonitoringConfig,
}

impl Debug for XdsSyncConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("XdsSyncConfig")
            .field("runtime", &self.runtime)
            .field("dataplane", &self.dataplane)
            .field("insight", &self.insight)
            .finish()
    }
}

impl XdsSyncConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so that further overrides can be applied with
    /// `with_override_config()`. Callers must call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/xds.toml");
    /// std::env::set_var("XDS__RUNTIME__INSTANCE_ID", "cp-1");
    /// let cfg = XdsSyncConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order: current values, then the file, then environment variables.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.runtime.validate()?;
        self.dataplane.validate()?;
        self.insight.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
