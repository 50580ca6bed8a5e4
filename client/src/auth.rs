//! Authentication: a static access token or OAuth client credentials.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::RequestBuilder;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use taskmgmt_core::error::{Result, TaskMgmtError};

/// Credentials for the Genesys Cloud API.
///
/// The [`Debug`] impl redacts tokens and secrets.
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued access token
    AccessToken(String),
    /// OAuth client credentials grant against the region's login host
    ClientCredentials {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"[REDACTED]").finish(),
            Self::ClientCredentials {
                client_id, token_url, ..
            } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("token_url", token_url)
                .finish(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Applies credentials to outgoing requests, caching OAuth tokens.
#[derive(Debug, Clone)]
pub struct ClientAuth {
    credentials: Credentials,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    http_client: reqwest::Client,
}

impl ClientAuth {
    pub fn new(credentials: Credentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Token to send as `Authorization: Bearer`
    pub async fn bearer_token(&self) -> Result<String> {
        let (client_id, client_secret, token_url) = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
                token_url,
            } => (client_id, client_secret, token_url),
        };

        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref().filter(|t| !t.is_expired()) {
                return Ok(cached.access_token.clone());
            }
        }

        debug!(token_url = %token_url, "Requesting OAuth access token");
        let response = self
            .http_client
            .post(token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| TaskMgmtError::Transport(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(TaskMgmtError::Configuration(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TaskMgmtError::Serialization(format!("Failed to parse token response: {e}")))?;

        // Refresh 30 seconds before the token actually expires
        let expires_at = token
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs.saturating_sub(30)));

        let access_token = token.access_token.clone();
        *self.cached_token.write().await = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    pub async fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.bearer_token().await?;
        Ok(builder.bearer_auth(token))
    }

    /// Forget the cached token, e.g. after a 401
    pub async fn invalidate(&self) {
        *self.cached_token.write().await = None;
    }
}
