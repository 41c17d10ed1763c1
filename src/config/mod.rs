// ABOUTME: Configuration types and parsing for relevo.yml.
// ABOUTME: Handles YAML parsing, validated newtypes, and the init template.

mod deserialize;
mod service;

pub use service::ServiceConfig;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::DeployOptions;
use crate::error::{Error, Result};
use crate::types::SlotName;

pub const CONFIG_FILENAME: &str = "relevo.yml";
pub const CONFIG_FILENAME_ALT: &str = "relevo.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".relevo/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize::deserialize_slot_name")]
    pub slot: SlotName,

    /// Root directory of the artifact store.
    pub store: PathBuf,

    pub service: ServiceConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub acceptance: Option<AcceptanceConfig>,

    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub health_timeout: Duration,

    #[serde(default = "default_retain_backups")]
    pub retain_backups: usize,

    #[serde(default = "default_swap_retries")]
    pub swap_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Reject artifacts below this size. Catches truncated uploads and
    /// empty placeholder files.
    #[serde(default = "default_min_size_bytes")]
    pub min_size_bytes: u64,

    /// Accepted format names (empty = accept any format).
    #[serde(default)]
    pub formats: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_size_bytes(),
            formats: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptanceConfig {
    /// Script run against the staged artifact. Exit status decides.
    pub script: PathBuf,

    #[serde(default = "default_acceptance_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_min_size_bytes() -> u64 {
    1024
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_acceptance_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_retain_backups() -> usize {
    5
}

fn default_swap_retries() -> u32 {
    3
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Deployment options derived from this config.
    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            acceptance_timeout: self
                .acceptance
                .as_ref()
                .map(|a| a.timeout)
                .unwrap_or_else(default_acceptance_timeout),
            health_check_timeout: self.health_timeout,
            retain_backups: self.retain_backups,
            swap_retries: self.swap_retries,
            restart_retries: self.service.restart_retries,
            ..DeployOptions::default()
        }
    }

    pub fn template() -> Self {
        Config {
            slot: SlotName::new("my-model").expect("template slot name is valid"),
            store: PathBuf::from("/var/lib/relevo"),
            service: ServiceConfig::template(),
            validation: ValidationConfig::default(),
            acceptance: None,
            health_timeout: default_health_timeout(),
            retain_backups: default_retain_backups(),
            swap_retries: default_swap_retries(),
        }
    }
}

pub fn init_config(dir: &Path, slot: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(s) = slot {
        config.slot = SlotName::new(s).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"slot: {}
store: {}
service:
  name: {}
  restart_cmd: {}
  probe_cmd: {}
"#,
        config.slot,
        config.store.display(),
        config.service.name,
        config.service.restart_cmd,
        config.service.probe_cmd,
    )
}
