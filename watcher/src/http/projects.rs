//! Project endpoints

use openapi_client::models::{ProjectDetails, ProjectStatusResponse, RedeployResponse};
use secrecy::SecretString;

use crate::errors::WatchError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Project with its deployment history
    pub async fn get_project_details(
        &self,
        project_id: &str,
        token: &SecretString,
    ) -> Result<ProjectDetails, WatchError> {
        let path = format!("/api/projects/{}", project_id);
        self.get(&path, token).await
    }

    /// Current pipeline status, meant for polling
    pub async fn get_project_status(
        &self,
        project_id: &str,
        token: &SecretString,
    ) -> Result<ProjectStatusResponse, WatchError> {
        let path = format!("/api/projects/{}/status", project_id);
        self.get(&path, token).await
    }

    /// Queue a new build of the project
    pub async fn redeploy_project(
        &self,
        project_id: &str,
        token: &SecretString,
    ) -> Result<RedeployResponse, WatchError> {
        let path = format!("/api/projects/{}/redeploy", project_id);
        self.post(&path, token, &serde_json::json!({})).await
    }
}
