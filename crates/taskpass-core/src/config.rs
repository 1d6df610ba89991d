//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the session server URL, the push gateway URL, the request timeout, the
//! task database location and the last used username.
//!
//! Configuration is stored at `~/.config/taskpass/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::REQUEST_TIMEOUT_SECS;
use crate::notifications::DEFAULT_PUSH_URL;
use crate::tasks::DATABASE_FILE;

/// Application name used for config/data directory paths
const APP_NAME: &str = "taskpass";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session server used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "https://first-goldfish-conversely.ngrok-free.app";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "TASKPASS_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub push_url: String,
    pub request_timeout_secs: u64,
    pub database_file: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            push_url: DEFAULT_PUSH_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            database_file: None,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            debug!(path = %path.display(), "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Apply `TASKPASS_BASE_URL` when set and non-empty
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|url| !url.trim().is_empty()) {
            debug!(base_url = %url, "Base URL overridden from environment");
            self.base_url = url;
        }
        self
    }

    /// Per-request timeout; `0` falls back to the default
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => {
                warn!(
                    default_secs = REQUEST_TIMEOUT_SECS,
                    "request_timeout_secs is 0, using default"
                );
                Duration::from_secs(REQUEST_TIMEOUT_SECS)
            }
            secs => Duration::from_secs(secs),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }

    /// Configured database file, or `todo.db` in the data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match self.database_file {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(DATABASE_FILE)),
        }
    }
}
