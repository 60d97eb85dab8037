//! Deployment log endpoints

use openapi_client::models::LogsResponse;
use secrecy::SecretString;

use crate::errors::WatchError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Full log buffer of a deployment along with its status
    pub async fn get_deployment_logs(
        &self,
        project_id: &str,
        deploy_id: &str,
        token: &SecretString,
    ) -> Result<LogsResponse, WatchError> {
        let path = format!("/api/deployments/{}/{}/logs", project_id, deploy_id);
        self.get(&path, token).await
    }
}
