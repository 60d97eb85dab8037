//! Dashboard collaborator interface

use std::sync::Arc;

use async_trait::async_trait;
use openapi_client::models::{
    AuthUrl, ConnectionStatus, LogsResponse, ProjectDetails, ProjectStatusResponse,
    RedeployResponse, Repository,
};

use crate::authn::provider::CredentialProvider;
use crate::errors::WatchError;
use crate::http::client::HttpClient;

/// Everything the observers need from the backend
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn connection_status(&self) -> Result<ConnectionStatus, WatchError>;

    async fn list_repos(&self) -> Result<Vec<Repository>, WatchError>;

    async fn auth_url(&self) -> Result<AuthUrl, WatchError>;

    async fn project_details(&self, project_id: &str) -> Result<ProjectDetails, WatchError>;

    async fn project_status(&self, project_id: &str) -> Result<ProjectStatusResponse, WatchError>;

    async fn deployment_logs(
        &self,
        project_id: &str,
        deploy_id: &str,
    ) -> Result<LogsResponse, WatchError>;

    async fn redeploy(&self, project_id: &str) -> Result<RedeployResponse, WatchError>;
}

/// [`DashboardApi`] over HTTP, fetching a bearer token per request
pub struct BackendApi {
    http_client: Arc<HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
}

impl BackendApi {
    pub fn new(http_client: Arc<HttpClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http_client,
            credentials,
        }
    }
}

#[async_trait]
impl DashboardApi for BackendApi {
    async fn connection_status(&self) -> Result<ConnectionStatus, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client.get_connection_status(&token).await
    }

    async fn list_repos(&self) -> Result<Vec<Repository>, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client.list_repositories(&token).await
    }

    async fn auth_url(&self) -> Result<AuthUrl, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client.get_auth_url(&token).await
    }

    async fn project_details(&self, project_id: &str) -> Result<ProjectDetails, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client.get_project_details(project_id, &token).await
    }

    async fn project_status(&self, project_id: &str) -> Result<ProjectStatusResponse, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client.get_project_status(project_id, &token).await
    }

    async fn deployment_logs(
        &self,
        project_id: &str,
        deploy_id: &str,
    ) -> Result<LogsResponse, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client
            .get_deployment_logs(project_id, deploy_id, &token)
            .await
    }

    async fn redeploy(&self, project_id: &str) -> Result<RedeployResponse, WatchError> {
        let token = self.credentials.bearer().await?;
        self.http_client.redeploy_project(project_id, &token).await
    }
}
