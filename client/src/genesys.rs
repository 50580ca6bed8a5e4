use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use taskmgmt_core::error::{Result, TaskMgmtError};

use crate::auth::{ClientAuth, Credentials};
use crate::common::{region_base_url, region_token_url, status_to_error, transport_error};

/// Default timeout applied to every API request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("taskmgmt-client/", env!("CARGO_PKG_VERSION"));

/// HTTP implementation of the task management capability traits
///
/// Holds one pooled [`reqwest::Client`]; cloning is cheap and clones share
/// both the connection pool and the cached OAuth token.
#[derive(Debug, Clone)]
pub struct GenesysClient {
    base_url: String,
    auth: ClientAuth,
    http_client: reqwest::Client,
}

impl GenesysClient {
    /// Create a client against an explicit API base URL
    ///
    /// # Arguments
    /// * `base_url` - API host, e.g. `https://api.mypurecloud.com`
    /// * `credentials` - Access token or OAuth client credentials
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    /// * `Ok(GenesysClient)` - Ready to use client
    /// * `Err(TaskMgmtError::Configuration)` - If the base URL is empty or the
    ///   HTTP client cannot be built
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TaskMgmtError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Self::with_http_client(base_url, credentials, http_client)
    }

    /// Create a client for a named region using OAuth client credentials
    pub fn for_region(
        region: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let unknown = || TaskMgmtError::Configuration(format!("Unknown region '{region}'"));
        let base_url = region_base_url(region).ok_or_else(unknown)?;
        let token_url = region_token_url(region).ok_or_else(unknown)?;

        Self::new(
            &base_url,
            Credentials::ClientCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
                token_url,
            },
            timeout,
        )
    }

    /// Create a client that reuses an existing [`reqwest::Client`]
    pub fn with_http_client(
        base_url: &str,
        credentials: Credentials,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(TaskMgmtError::Configuration("API base URL is empty".to_string()));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            auth: ClientAuth::new(credentials, http_client.clone()),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let body = self.execute(Method::GET, path, query, None).await?;
        decode(&body)
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let payload = serde_json::to_value(body)?;
        let body = self.execute(Method::POST, path, &[], Some(&payload)).await?;
        decode(&body)
    }

    pub(crate) async fn patch_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let payload = serde_json::to_value(body)?;
        let body = self.execute(Method::PATCH, path, &[], Some(&payload)).await?;
        decode(&body)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, &[], None).await.map(|_| ())
    }

    /// Send one request, refreshing the OAuth token once on a 401
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Option<&serde_json::Value>,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut refreshed = false;

        loop {
            let mut builder = self.http_client.request(method.clone(), &url);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(payload) = payload {
                builder = builder.json(payload);
            }
            let builder = self.auth.apply(builder).await?;

            debug!(method = %method, url = %url, "Sending API request");
            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status();
            let body = response.text().await.map_err(transport_error)?;

            if status.is_success() {
                return Ok(body);
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                warn!(url = %url, "Access token rejected, refreshing");
                self.auth.invalidate().await;
                refreshed = true;
                continue;
            }

            debug!(method = %method, url = %url, status = status.as_u16(), "API request failed");
            return Err(status_to_error(status, &body));
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    // DELETE and some PATCH responses come back empty
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(TaskMgmtError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = GenesysClient::new(
            " https://api.mypurecloud.com/ ",
            Credentials::AccessToken("token".to_string()),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://api.mypurecloud.com");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let err = GenesysClient::new("  ", Credentials::AccessToken("t".to_string()), DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, TaskMgmtError::Configuration(_)));
    }

    #[test]
    fn test_for_region() {
        let client = GenesysClient::for_region("eu-central-1", "id", "secret", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "https://api.mypurecloud.de");

        let err = GenesysClient::for_region("nowhere", "id", "secret", DEFAULT_TIMEOUT).unwrap_err();
        assert_eq!(err, TaskMgmtError::Configuration("Unknown region 'nowhere'".to_string()));
    }

    #[test]
    fn test_decode_empty_body() {
        let unit: () = decode("").unwrap();
        assert_eq!(unit, ());
        let value: Option<u32> = decode("  ").unwrap();
        assert_eq!(value, None);
    }
}
