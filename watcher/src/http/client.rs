//! HTTP client implementation

use std::time::Duration;

use openapi_client::models::ErrorResponse;
use reqwest::{header, Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::WatchError;

/// HTTP client for the dashboard backend
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client. `timeout` of `None` lets slow requests hang.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, WatchError> {
        Url::parse(base_url)
            .map_err(|e| WatchError::ConfigError(format!("Invalid base URL {}: {}", base_url, e)))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
    ) -> Result<T, WatchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            )
            .send()
            .await?;

        Self::decode("GET", response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<T, WatchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            )
            .json(body)
            .send()
            .await?;

        Self::decode("POST", response).await
    }

    async fn decode<T: DeserializeOwned>(method: &str, response: Response) -> Result<T, WatchError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            return Err(api_error(status, &body));
        }

        Ok(response.json().await?)
    }
}

/// Turn a non-success response into a structured error
pub fn api_error(status: u16, body: &str) -> WatchError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message())
        .unwrap_or_else(|_| body.to_string());
    WatchError::api(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiErrorKind;

    #[test]
    fn test_api_error_reads_detail() {
        let err = api_error(401, r#"{"detail": "Token expired"}"#);
        match err {
            WatchError::Api { status, kind, message } => {
                assert_eq!(status, 401);
                assert_eq!(kind, ApiErrorKind::Unauthorized);
                assert_eq!(message, "Token expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_keeps_plain_body() {
        let err = api_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "API error (502): Bad Gateway");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpClient::new("not a url", None),
            Err(WatchError::ConfigError(_))
        ));
        let client = HttpClient::new("http://localhost:8000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
