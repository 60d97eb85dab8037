//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{ClassifyMode, WatchError};
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Also write logs to daily files under the storage directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Polling cadence
    #[serde(default)]
    pub polling: PollingSettings,

    /// Per-request timeout; unset means a hung request delays the next tick
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Treat error messages mentioning tokens as authentication failures
    #[serde(default)]
    pub classify_by_message: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            polling: PollingSettings::default(),
            request_timeout_secs: None,
            classify_by_message: false,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, WatchError> {
        if !file.exists().await {
            return Ok(Self::default());
        }
        let settings: Settings = file.read_json().await?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), WatchError> {
        Url::parse(&self.backend.base_url).map_err(|e| {
            WatchError::ConfigError(format!("backend.base_url {}: {}", self.backend.base_url, e))
        })?;
        if self.polling.status_interval_ms == 0 || self.polling.log_interval_ms == 0 {
            return Err(WatchError::ConfigError(
                "polling intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn classify_mode(&self) -> ClassifyMode {
        if self.classify_by_message {
            ClassifyMode::Legacy
        } else {
            ClassifyMode::Structured
        }
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
        }
    }
}

/// Polling cadence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Project status polling interval in milliseconds
    #[serde(default = "default_status_interval")]
    pub status_interval_ms: u64,

    /// Deployment log polling interval in milliseconds
    #[serde(default = "default_log_interval")]
    pub log_interval_ms: u64,
}

fn default_status_interval() -> u64 {
    3000
}

fn default_log_interval() -> u64 {
    2000
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            status_interval_ms: default_status_interval(),
            log_interval_ms: default_log_interval(),
        }
    }
}

impl PollingSettings {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }
}
