//! Access tokens for credential profiles
//!
//! Key files are read when a profile is selected for a backend call, not at
//! startup. A profile whose key file is missing fails the attempt that
//! selected it, and the retry policy moves on to the next profile.

use crate::models::backend::BackendError;
use crate::models::credentials::CredentialProfile;
use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// OAuth scope requested for backend calls
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Source of bearer tokens for a credential profile
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self, profile: &CredentialProfile) -> Result<String, BackendError>;
}

/// Tokens minted from service-account key files
///
/// Parsed accounts are cached per key path; each account caches and refreshes
/// its own token.
#[derive(Default)]
pub struct ServiceAccountTokens {
    accounts: Mutex<HashMap<PathBuf, Arc<CustomServiceAccount>>>,
}

impl ServiceAccountTokens {
    pub fn new() -> Self {
        Self::default()
    }

    async fn account(
        &self,
        profile: &CredentialProfile,
    ) -> Result<Arc<CustomServiceAccount>, BackendError> {
        let path = profile.key_path();

        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        if !exists {
            tracing::error!(
                project_id = %profile.project_id(),
                key_path = %path.display(),
                "Key file not found for selected credential profile"
            );
            return Err(BackendError::MissingKeyFile {
                path: path.display().to_string(),
            });
        }

        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.get(path) {
            return Ok(account.clone());
        }

        let account = CustomServiceAccount::from_file(path).map_err(|e| BackendError::Auth {
            project: profile.project_id().to_string(),
            reason: e.to_string(),
        })?;
        let account = Arc::new(account);
        accounts.insert(path.to_path_buf(), account.clone());

        tracing::info!(
            project_id = %profile.project_id(),
            location = %profile.location(),
            "Loaded service account for credential profile"
        );

        Ok(account)
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self, profile: &CredentialProfile) -> Result<String, BackendError> {
        let account = self.account(profile).await?;
        let token = account
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| BackendError::Auth {
                project: profile.project_id().to_string(),
                reason: e.to_string(),
            })?;
        Ok(token.as_str().to_string())
    }
}

/// Fixed bearer token, for local emulators and tests
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self, _profile: &CredentialProfile) -> Result<String, BackendError> {
        Ok(self.0.clone())
    }
}
