//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use openapi_client::models::{
    AuthUrl, ConnectionStatus, DeploymentStatus, DeploymentSummary, LogEntry, LogLevel,
    LogsResponse, ProjectDetails, ProjectInfo, ProjectStatus, ProjectStatusResponse,
    RedeployResponse, Repository,
};
use secrecy::SecretString;
use shorwatch::api::DashboardApi;
use shorwatch::authn::provider::CredentialProvider;
use shorwatch::errors::WatchError;

pub const PROJECT: &str = "p-1";

/// Scripted reply of a fake endpoint
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Unauthorized,
    Fail(String),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T, WatchError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Unauthorized => Err(WatchError::api(401, "Could not validate credentials")),
            Reply::Fail(message) => Err(WatchError::api(500, message)),
        }
    }
}

#[derive(Debug, Clone)]
struct Step<T> {
    delay: Duration,
    reply: Reply<T>,
}

/// Replies in order; the last one repeats forever
#[derive(Debug)]
pub struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
}

impl<T: Clone> Script<T> {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, reply: Reply<T>) -> &Self {
        self.push_delayed(Duration::ZERO, reply)
    }

    pub fn push_delayed(&self, delay: Duration, reply: Reply<T>) -> &Self {
        self.steps.lock().unwrap().push_back(Step { delay, reply });
        self
    }

    async fn next(&self) -> Result<T, WatchError> {
        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };
        let Some(step) = step else {
            return Err(WatchError::Internal("unscripted call".to_string()));
        };
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.reply.into_result()
    }
}

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory backend recording every call
#[derive(Default)]
pub struct FakeApi {
    pub connection: Script<ConnectionStatus>,
    pub repos: Script<Vec<Repository>>,
    pub status: Script<ProjectStatusResponse>,
    pub details: Script<ProjectDetails>,
    pub redeploy: Script<RedeployResponse>,
    logs: Mutex<HashMap<String, Arc<Script<LogsResponse>>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script of the log endpoint of `deploy_id`
    pub fn logs(&self, deploy_id: &str) -> Arc<Script<LogsResponse>> {
        self.logs
            .lock()
            .unwrap()
            .entry(deploy_id.to_string())
            .or_default()
            .clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn connection_status(&self) -> Result<ConnectionStatus, WatchError> {
        self.record("connection_status");
        self.connection.next().await
    }

    async fn list_repos(&self) -> Result<Vec<Repository>, WatchError> {
        self.record("list_repos");
        self.repos.next().await
    }

    async fn auth_url(&self) -> Result<AuthUrl, WatchError> {
        self.record("auth_url");
        Ok(AuthUrl {
            url: "https://github.com/login/oauth/authorize?client_id=test".to_string(),
        })
    }

    async fn project_details(&self, _project_id: &str) -> Result<ProjectDetails, WatchError> {
        self.record("project_details");
        self.details.next().await
    }

    async fn project_status(&self, _project_id: &str) -> Result<ProjectStatusResponse, WatchError> {
        self.record("project_status");
        self.status.next().await
    }

    async fn deployment_logs(
        &self,
        _project_id: &str,
        deploy_id: &str,
    ) -> Result<LogsResponse, WatchError> {
        self.record(format!("logs:{}", deploy_id));
        let script = self.logs(deploy_id);
        script.next().await
    }

    async fn redeploy(&self, _project_id: &str) -> Result<RedeployResponse, WatchError> {
        self.record("redeploy");
        self.redeploy.next().await
    }
}

/// Credential provider that only counts sign-outs
#[derive(Default)]
pub struct FakeCredentials {
    sign_outs: AtomicUsize,
}

impl FakeCredentials {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn bearer(&self) -> Result<SecretString, WatchError> {
        Ok(SecretString::from("test-token".to_string()))
    }

    async fn sign_out(&self) -> Result<(), WatchError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================== BUILDERS ================================== //

pub fn connected(connected: bool) -> ConnectionStatus {
    ConnectionStatus {
        connected,
        username: connected.then(|| "octocat".to_string()),
    }
}

pub fn repo(name: &str) -> Repository {
    Repository {
        id: 1,
        name: name.to_string(),
        full_name: format!("octocat/{}", name),
        html_url: format!("https://github.com/octocat/{}", name),
        clone_url: format!("https://github.com/octocat/{}.git", name),
        private: false,
        default_branch: "main".to_string(),
        updated_at: None,
        language: Some("Python".to_string()),
    }
}

pub fn status(status: ProjectStatus) -> ProjectStatusResponse {
    ProjectStatusResponse {
        project_id: PROJECT.to_string(),
        status,
        function_url: (status == ProjectStatus::Live).then(|| "https://p-1.example.app".to_string()),
    }
}

pub fn deployment(deploy_id: &str, status: DeploymentStatus) -> DeploymentSummary {
    DeploymentSummary {
        deploy_id: deploy_id.to_string(),
        build_id: None,
        status,
        started_at: "2025-01-01T00:00:00".to_string(),
        finished_at: None,
    }
}

pub fn details(deployments: Vec<DeploymentSummary>) -> ProjectDetails {
    ProjectDetails {
        project: ProjectInfo {
            project_id: PROJECT.to_string(),
            name: "demo".to_string(),
            github_repo: "octocat/demo".to_string(),
            status: ProjectStatus::Building,
            function_url: None,
            custom_url: None,
            start_command: None,
            created_at: None,
            updated_at: None,
        },
        deployments,
    }
}

pub fn entry(message: &str) -> LogEntry {
    LogEntry {
        timestamp: "2025-01-01T00:00:00".to_string(),
        message: message.to_string(),
        level: LogLevel::Info,
    }
}

pub fn logs(messages: &[&str], status: DeploymentStatus) -> LogsResponse {
    LogsResponse {
        logs: messages.iter().map(|m| entry(m)).collect(),
        status,
    }
}

/// Let spawned tasks run without moving the paused clock
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
