//! Credential providers

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::authn::credential::Credential;
use crate::errors::WatchError;
use crate::filesys::file::File;

/// Environment variable that overrides the credentials file
pub const TOKEN_ENV_VAR: &str = "SHORWATCH_TOKEN";

/// Supplies the bearer token for each request
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token; `TokenError` when missing or expired
    async fn bearer(&self) -> Result<SecretString, WatchError>;

    /// Drop the stored credential
    async fn sign_out(&self) -> Result<(), WatchError>;
}

/// On-disk credentials document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
}

/// Credentials read from the environment or a JSON file
pub struct FileCredentials {
    file: Arc<File>,
    cached: RwLock<Option<Arc<Credential>>>,
}

impl FileCredentials {
    pub fn new(file: Arc<File>) -> Self {
        Self {
            file,
            cached: RwLock::new(None),
        }
    }

    /// Persist a token for later runs
    pub async fn store(&self, token: &str) -> Result<(), WatchError> {
        self.file
            .write_json(&StoredCredentials {
                token: token.to_string(),
            })
            .await?;
        self.file.set_permissions_600().await?;

        let mut cached = self.cached.write().await;
        *cached = Some(Arc::new(Credential::from_raw(token)));
        Ok(())
    }

    async fn load(&self) -> Result<Credential, WatchError> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                return Ok(Credential::from_raw(token.trim()));
            }
        }

        if !self.file.exists().await {
            return Err(WatchError::TokenError(format!(
                "No credentials found at {}",
                self.file.path().display()
            )));
        }
        let stored: StoredCredentials = self.file.read_json().await?;
        Ok(Credential::from_raw(stored.token))
    }
}

#[async_trait]
impl CredentialProvider for FileCredentials {
    async fn bearer(&self) -> Result<SecretString, WatchError> {
        let credential = {
            let cached = self.cached.read().await;
            cached.clone()
        };

        let credential = match credential {
            Some(credential) => credential,
            None => {
                let loaded = Arc::new(self.load().await?);
                let mut cached = self.cached.write().await;
                *cached = Some(loaded.clone());
                loaded
            }
        };

        if credential.is_expired() {
            warn!("Session token expired at {:?}", credential.expires_at());
            return Err(WatchError::TokenError("Token expired".to_string()));
        }

        Ok(credential.bearer())
    }

    async fn sign_out(&self) -> Result<(), WatchError> {
        info!("Signing out, removing {}", self.file.path().display());
        {
            let mut cached = self.cached.write().await;
            *cached = None;
        }
        self.file.delete().await
    }
}
