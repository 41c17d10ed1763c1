// ABOUTME: Serving-process configuration: supervisor commands and probe cadence.
// ABOUTME: Durations use humantime strings with sensible defaults.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name handed to the supervisor commands via RELEVO_SERVICE.
    pub name: String,

    /// Command that restarts the serving process.
    pub restart_cmd: String,

    /// Command whose exit status reports liveness.
    pub probe_cmd: String,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default = "default_restart_retries")]
    pub restart_retries: u32,
}

impl ServiceConfig {
    pub fn template() -> Self {
        Self {
            name: "model-server".to_string(),
            restart_cmd: "systemctl restart model-server".to_string(),
            probe_cmd: "curl -fsS localhost:8080/health".to_string(),
            poll_interval: default_poll_interval(),
            restart_retries: default_restart_retries(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_restart_retries() -> u32 {
    2
}
