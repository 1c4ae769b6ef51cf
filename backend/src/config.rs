//! Runtime configuration for the backend binary.
//!
//! Read from an optional YAML file (`BABY_TRACKER_CONFIG`), then a few
//! environment overrides are applied on top.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "BABY_TRACKER_CONFIG";
pub const DATA_DIR_ENV: &str = "BABY_TRACKER_DATA_DIR";
pub const BIND_ENV: &str = "BABY_TRACKER_BIND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One YAML file per collection under the data directory
    Yaml,
    /// Nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_address: String,
    pub storage: StorageBackend,
    /// JSON file holding the operator-published admin settings
    pub admin_settings_path: Option<PathBuf>,
    pub settings_poll_seconds: u64,
    pub allowed_origin: String,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("baby-tracker");
        Self {
            data_dir,
            bind_address: "127.0.0.1:3000".to_string(),
            storage: StorageBackend::Yaml,
            admin_settings_path: None,
            settings_poll_seconds: 300,
            allowed_origin: "http://localhost:8080".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file named by `BABY_TRACKER_CONFIG`, then env overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(data_dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.bind_address = bind;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Where operator-published admin settings are read from
    pub fn admin_settings_source(&self) -> PathBuf {
        self.admin_settings_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("admin_settings.json"))
    }

    /// Last good admin settings blob, reused at startup
    pub fn admin_settings_cache(&self) -> PathBuf {
        self.data_dir.join("cache").join("admin_settings.json")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.data_dir.join("photos")
    }

    pub fn settings_poll_interval(&self) -> Duration {
        Duration::from_secs(self.settings_poll_seconds.max(1))
    }
}
