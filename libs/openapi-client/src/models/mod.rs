//! API models

use std::fmt;

use serde::{Deserialize, Serialize};

/// GitHub connection status (`GET /api/github/status`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// GitHub authorization URL (`GET /api/github/auth-url`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUrl {
    pub url: String,
}

/// An importable repository (`GET /api/github/repos`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    #[serde(default)]
    pub private: bool,
    pub default_branch: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Project pipeline status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Cloning,
    Preparing,
    Uploading,
    Building,
    Deploying,
    Live,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "PENDING",
            ProjectStatus::Cloning => "CLONING",
            ProjectStatus::Preparing => "PREPARING",
            ProjectStatus::Uploading => "UPLOADING",
            ProjectStatus::Building => "BUILDING",
            ProjectStatus::Deploying => "DEPLOYING",
            ProjectStatus::Live => "LIVE",
            ProjectStatus::Failed => "FAILED",
            ProjectStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single deployment (build) record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    InProgress,
    Succeeded,
    Failed,
    Stopped,
    TimedOut,
    #[serde(other)]
    Unknown,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::InProgress => "IN_PROGRESS",
            DeploymentStatus::Succeeded => "SUCCEEDED",
            DeploymentStatus::Failed => "FAILED",
            DeploymentStatus::Stopped => "STOPPED",
            DeploymentStatus::TimedOut => "TIMED_OUT",
            DeploymentStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project status snapshot (`GET /api/projects/{id}/status`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatusResponse {
    pub project_id: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub function_url: Option<String>,
}

/// Project as returned inside the details payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: String,
    pub name: String,
    pub github_repo: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub function_url: Option<String>,
    #[serde(default)]
    pub custom_url: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Entry of a project's deployment history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub deploy_id: String,
    #[serde(default)]
    pub build_id: Option<String>,
    pub status: DeploymentStatus,
    pub started_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
}

/// Project details with deployment history (`GET /api/projects/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub project: ProjectInfo,
    #[serde(default)]
    pub deployments: Vec<DeploymentSummary>,
}

/// Log line severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Warn,
    Error,
    Success,
    #[serde(other)]
    Info,
}

/// A single build log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
    pub level: LogLevel,
}

/// Full log buffer of a deployment (`GET /api/deployments/{project}/{deploy}/logs`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    pub status: DeploymentStatus,
}

/// Redeploy acknowledgement (`POST /api/projects/{id}/redeploy`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeployResponse {
    pub project_id: String,
    pub message: String,
    pub status: ProjectStatus,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    /// Human readable message, whether `detail` is a string or a validation list
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_statuses_fall_back() {
        let status: ProjectStatus = serde_json::from_str("\"QUEUED\"").unwrap();
        assert_eq!(status, ProjectStatus::Unknown);

        let status: DeploymentStatus = serde_json::from_str("\"TIMED_OUT\"").unwrap();
        assert_eq!(status, DeploymentStatus::TimedOut);
    }

    #[test]
    fn test_logs_response_parses_backend_payload() {
        let body = r#"{
            "logs": [
                {"timestamp": "2025-01-01T00:00:00", "message": "Cloning repo", "level": "INFO"},
                {"timestamp": "2025-01-01T00:00:01", "message": "Build complete", "level": "SUCCESS"},
                {"timestamp": "2025-01-01T00:00:02", "message": "debug line", "level": "DEBUG"}
            ],
            "status": "IN_PROGRESS"
        }"#;
        let response: LogsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, DeploymentStatus::InProgress);
        assert_eq!(response.logs[1].level, LogLevel::Success);
        assert_eq!(response.logs[2].level, LogLevel::Info);
    }

    #[test]
    fn test_error_detail_message() {
        let err: ErrorResponse =
            serde_json::from_str(r#"{"detail": "GitHub token expired or invalid. Please reconnect."}"#)
                .unwrap();
        assert_eq!(err.message(), "GitHub token expired or invalid. Please reconnect.");
    }
}
