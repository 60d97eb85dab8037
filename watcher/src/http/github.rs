//! GitHub connection endpoints

use openapi_client::models::{AuthUrl, ConnectionStatus, Repository};
use secrecy::SecretString;

use crate::errors::WatchError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Whether the user has connected the GitHub App
    pub async fn get_connection_status(
        &self,
        token: &SecretString,
    ) -> Result<ConnectionStatus, WatchError> {
        self.get("/api/github/status", token).await
    }

    /// Repositories the GitHub installation can import
    pub async fn list_repositories(
        &self,
        token: &SecretString,
    ) -> Result<Vec<Repository>, WatchError> {
        self.get("/api/github/repos", token).await
    }

    /// Where to send the user to install the GitHub App
    pub async fn get_auth_url(&self, token: &SecretString) -> Result<AuthUrl, WatchError> {
        self.get("/api/github/auth-url", token).await
    }
}
