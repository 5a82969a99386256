use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Identifier of this control plane process. Recorded on every
    /// subscription so that instances do not delete proxies served by a peer.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            instance_id: default_instance_id(),
            log_dir: default_log_dir(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.instance_id.trim().is_empty() {
            return Err(Error::InvalidConfig("runtime.instance_id must not be empty".into()));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("runtime.log_dir must not be empty".into()));
        }
        Ok(())
    }
}

fn default_instance_id() -> String {
    format!("cp-{}", nanoid::nanoid!(8))
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
