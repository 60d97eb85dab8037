//! Application configuration options

use std::time::Duration;

use crate::errors::ClassifyMode;
use crate::observe::poller::PollerOptions;
use crate::observe::tailer::TailerOptions;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Project to observe
    pub project_id: String,

    /// Backend API base URL
    pub backend_base_url: String,

    /// Project status poller options
    pub status_poller: PollerOptions,

    /// Deployment log tailer options
    pub log_tailer: TailerOptions,

    /// How fetch failures are told apart
    pub classify: ClassifyMode,

    /// Keep running after the project reaches a terminal status
    pub follow: bool,

    /// Per-request timeout
    pub request_timeout: Option<Duration>,
}

impl WatchOptions {
    pub fn from_settings(project_id: impl Into<String>, settings: &Settings) -> Self {
        Self {
            project_id: project_id.into(),
            backend_base_url: settings.backend.base_url.clone(),
            status_poller: PollerOptions {
                interval: settings.polling.status_interval(),
            },
            log_tailer: TailerOptions {
                interval: settings.polling.log_interval(),
            },
            classify: settings.classify_mode(),
            follow: false,
            request_timeout: settings.request_timeout(),
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from_settings(String::new(), &Settings::default())
    }
}
