//! Credential Providers
//!
//! The remote store only needs "a valid bearer token, now". Interactive
//! consent is not handled here: an authorized-user `token.json` must already
//! exist (the format written by Google's installed-app flow).

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{DriveError, DriveResult};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Supplies bearer tokens on demand
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> DriveResult<String>;
}

/// A fixed, externally managed token
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> DriveResult<String> {
        Ok(self.0.clone())
    }
}

/// Contents of an authorized-user `token.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AuthorizedUser {
    /// Usable for at least another minute
    fn is_fresh(&self) -> bool {
        match (&self.token, self.expiry) {
            (Some(_), Some(expiry)) => expiry - ChronoDuration::seconds(60) > Utc::now(),
            (Some(_), None) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Refresh-token backed provider reading `token.json`
pub struct AuthorizedUserToken {
    path: PathBuf,
    client: reqwest::Client,
    state: Mutex<Option<AuthorizedUser>>,
}

impl AuthorizedUserToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            client: reqwest::Client::new(),
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> DriveResult<AuthorizedUser> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DriveError::Auth(format!(
                "token file {} unavailable ({}); complete the OAuth consent flow first",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| DriveError::Auth(format!("invalid token file {}: {}", self.path.display(), e)))
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> DriveResult<()> {
        info!("Refreshing access token...");
        let token_uri = user.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);

        let response = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", user.refresh_token.as_str()),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!("token refresh failed ({}): {}", status, body)));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Auth(format!("invalid refresh response: {}", e)))?;

        user.token = Some(refreshed.access_token);
        user.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));
        Ok(())
    }

    async fn persist(&self, user: &AuthorizedUser) {
        let result = match serde_json::to_string_pretty(user) {
            Ok(json) => tokio::fs::write(&self.path, json).await,
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        };
        match result {
            Ok(()) => info!("Token saved to {}", self.path.display()),
            Err(e) => warn!("Failed to save refreshed token to {}: {}", self.path.display(), e),
        }
    }
}

#[async_trait]
impl TokenProvider for AuthorizedUserToken {
    async fn access_token(&self) -> DriveResult<String> {
        let mut state = self.state.lock().await;

        if state.is_none() {
            *state = Some(self.load().await?);
        }
        let Some(user) = state.as_mut() else {
            return Err(DriveError::Auth("no credentials loaded".to_string()));
        };

        if !user.is_fresh() {
            self.refresh(user).await?;
            self.persist(user).await;
        }

        user.token
            .clone()
            .ok_or_else(|| DriveError::Auth("refresh returned no access token".to_string()))
    }
}
