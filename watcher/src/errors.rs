//! Error types for the deployment watcher

use thiserror::Error;

/// Category of a non-success backend response, derived from the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Server,
    Other,
}

impl ApiErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::Forbidden,
            404 => ApiErrorKind::NotFound,
            400..=499 => ApiErrorKind::BadRequest,
            500..=599 => ApiErrorKind::Server,
            _ => ApiErrorKind::Other,
        }
    }
}

/// Main error type for the watcher
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        kind: ApiErrorKind,
        message: String,
    },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for WatchError {
    fn from(err: anyhow::Error) -> Self {
        WatchError::Internal(err.to_string())
    }
}

impl WatchError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        WatchError::Api {
            status,
            kind: ApiErrorKind::from_status(status),
            message: message.into(),
        }
    }
}

/// How failures are mapped to a cause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifyMode {
    /// Only structured error kinds decide
    #[default]
    Structured,

    /// Structured kinds, then free-text inspection of the message
    Legacy,
}

/// Why an initialization step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Expired or invalid credential; handled by signing out
    Auth,

    /// Anything else; shown to the user with a retry
    Generic,
}

const AUTH_MARKERS: [&str; 4] = ["token", "expired", "invalid", "reconnect"];

impl FailureCause {
    pub fn classify(err: &WatchError, mode: ClassifyMode) -> Self {
        match err {
            WatchError::Api {
                kind: ApiErrorKind::Unauthorized,
                ..
            }
            | WatchError::AuthError(_)
            | WatchError::TokenError(_) => return FailureCause::Auth,
            _ => {}
        }

        if mode == ClassifyMode::Legacy {
            let message = err.to_string().to_lowercase();
            if AUTH_MARKERS.iter().any(|m| message.contains(m)) {
                return FailureCause::Auth;
            }
        }

        FailureCause::Generic
    }
}
