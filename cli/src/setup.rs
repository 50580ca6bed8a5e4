use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use taskmgmt_client::GenesysClient;
use taskmgmt_core::{RetryPolicy, TaskManagementApi, TaskManagementProxies};

use crate::config::{ApiConfig, Config};

/// Everything a command needs: the proxies over one API backend and the
/// retry policy the resource functions run with
#[derive(Clone)]
pub struct App {
    pub proxies: TaskManagementProxies,
    pub policy: RetryPolicy,
}

impl App {
    /// Build an app over any backend, e.g. the in-memory fake
    pub fn with_api<A>(api: Arc<A>, policy: RetryPolicy) -> Self
    where
        A: TaskManagementApi + 'static,
    {
        Self {
            proxies: TaskManagementProxies::new(api),
            policy,
        }
    }
}

/// Create the HTTP client from the API section
pub fn create_client(config: &ApiConfig) -> Result<GenesysClient> {
    let base_url = config.base_url()?;
    let credentials = config.credentials()?;
    info!(base_url = %base_url, auth = config.auth_mode(), "Creating API client");

    GenesysClient::new(&base_url, credentials, config.request_timeout())
        .context("Failed to create API client")
}

/// Initialize the complete application
pub fn initialize_app(config: &Config) -> Result<App> {
    let client = create_client(&config.api)?;
    Ok(App::with_api(Arc::new(client), config.retry.to_policy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_with_token() {
        let mut config = Config::default();
        config.api.access_token = Some("token".to_string());
        config.api.base_url = Some("http://127.0.0.1:9".to_string());

        let client = create_client(&config.api).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn test_create_client_without_credentials() {
        let err = create_client(&Config::default().api).unwrap_err();
        assert!(err.to_string().contains("Missing credentials"));
    }

    #[test]
    fn test_initialize_app_uses_retry_config() {
        let mut config = Config::default();
        config.api.access_token = Some("token".to_string());
        config.retry.interval_ms = 50;

        let app = initialize_app(&config).unwrap();
        assert_eq!(app.policy.interval, std::time::Duration::from_millis(50));
    }
}
