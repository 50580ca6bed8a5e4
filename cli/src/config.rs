use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use taskmgmt_client::{region_base_url, region_token_url, Credentials};
use taskmgmt_core::RetryPolicy;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Genesys Cloud region, e.g. `us-east-1` or `eu-central-1`
    pub region: String,
    /// Explicit API host; takes precedence over the region
    #[serde(default)]
    pub base_url: Option<String>,
    /// Explicit login host for the OAuth token endpoint
    #[serde(default)]
    pub login_url: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    /// How long a name lookup waits for a fresh entity to show up
    pub lookup_timeout_secs: u64,
    /// How long a delete waits for the entity to disappear
    pub delete_timeout_secs: u64,
    /// How long a status write is replayed after cancelled transactions
    pub patch_timeout_secs: u64,
    /// How long a read after a write rides out 404s
    pub read_timeout_secs: u64,
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Config {
    /// Load configuration from environment variables and config files
    pub fn from_env() -> Result<Self> {
        let mut builder = ConfigBuilder::builder().add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(
                File::with_name(&config_file)
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        let config = builder
            .add_source(Self::environment())
            .build()
            .context("Failed to build configuration")?;

        let mut result: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Self::apply_standard_env_vars(&mut result);
        Ok(result)
    }

    /// Load configuration from a specific file path on top of the defaults
    pub fn from_file(path: &str) -> Result<Self> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                FileFormat::Toml,
            ))
            .add_source(File::with_name(path).format(FileFormat::Toml))
            .add_source(Self::environment())
            .build()
            .with_context(|| format!("Failed to build configuration from {path}"))?;

        let mut result: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration from file")?;

        Self::apply_standard_env_vars(&mut result);
        Ok(result)
    }

    /// `TASKMGMT_<SECTION>__<KEY>` overrides, e.g. `TASKMGMT_RETRY__INTERVAL_MS`
    fn environment() -> Environment {
        Environment::with_prefix("TASKMGMT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Apply the variables the Genesys Cloud tooling shares
    fn apply_standard_env_vars(config: &mut Config) {
        if let Ok(token) = env::var("GENESYSCLOUD_ACCESS_TOKEN") {
            config.api.access_token = Some(token);
        }
        if let Ok(client_id) = env::var("GENESYSCLOUD_OAUTHCLIENT_ID") {
            config.api.client_id = Some(client_id);
        }
        if let Ok(client_secret) = env::var("GENESYSCLOUD_OAUTHCLIENT_SECRET") {
            config.api.client_secret = Some(client_secret);
        }
        if let Ok(region) = env::var("GENESYSCLOUD_REGION") {
            config.api.region = region;
        }
        if let Ok(api_url) = env::var("GENESYSCLOUD_API_URL") {
            config.api.base_url = Some(api_url);
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.logging.level = log_level;
        }
    }

    pub fn merge_with_env(mut self) -> Self {
        Self::apply_standard_env_vars(&mut self);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ));
            }
        }

        self.api.base_url()?;
        self.api.credentials()?;

        if self.api.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("API request timeout cannot be 0"));
        }

        let retry = &self.retry;
        if retry.lookup_timeout_secs == 0
            || retry.delete_timeout_secs == 0
            || retry.patch_timeout_secs == 0
            || retry.read_timeout_secs == 0
        {
            return Err(anyhow::anyhow!("Retry timeouts must be greater than 0"));
        }
        if retry.interval_ms == 0 {
            return Err(anyhow::anyhow!("Retry interval must be greater than 0"));
        }

        Ok(())
    }
}

impl ApiConfig {
    /// API host from the explicit URL or the region
    pub fn base_url(&self) -> Result<String> {
        match self.base_url.as_deref().map(str::trim) {
            Some("") => Err(anyhow::anyhow!("API base URL cannot be empty")),
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => region_base_url(&self.region)
                .ok_or_else(|| anyhow::anyhow!("Unknown region: {}", self.region)),
        }
    }

    /// OAuth token endpoint from the explicit login host or the region
    pub fn token_url(&self) -> Result<String> {
        match self.login_url.as_deref().map(str::trim) {
            Some("") => Err(anyhow::anyhow!("Login URL cannot be empty")),
            Some(url) => Ok(format!("{}/oauth/token", url.trim_end_matches('/'))),
            None => region_token_url(&self.region)
                .ok_or_else(|| anyhow::anyhow!("Unknown region: {}", self.region)),
        }
    }

    /// An access token wins over client credentials
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(Credentials::AccessToken(token.to_string()));
        }

        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.is_empty() => {
                Ok(Credentials::ClientCredentials {
                    client_id: id.to_string(),
                    client_secret: secret.to_string(),
                    token_url: self.token_url()?,
                })
            }
            _ => Err(anyhow::anyhow!(
                "Missing credentials: set GENESYSCLOUD_ACCESS_TOKEN, or both \
                 GENESYSCLOUD_OAUTHCLIENT_ID and GENESYSCLOUD_OAUTHCLIENT_SECRET"
            )),
        }
    }

    /// Name of the authentication mode, for logs
    pub fn auth_mode(&self) -> &'static str {
        if self.access_token.is_some() {
            "access_token"
        } else {
            "client_credentials"
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            lookup_timeout: Duration::from_secs(self.lookup_timeout_secs),
            delete_timeout: Duration::from_secs(self.delete_timeout_secs),
            patch_timeout: Duration::from_secs(self.patch_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                region: "us-east-1".to_string(),
                base_url: None,
                login_url: None,
                request_timeout_secs: 30,
                access_token: None,
                client_id: None,
                client_secret: None,
            },
            retry: RetryConfig {
                lookup_timeout_secs: 15,
                delete_timeout_secs: 180,
                patch_timeout_secs: 60,
                read_timeout_secs: 60,
                interval_ms: 500,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: LogFormat::Compact,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token() -> Config {
        let mut config = Config::default();
        config.api.access_token = Some("token".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.region, "us-east-1");
        assert_eq!(config.api.base_url().unwrap(), "https://api.mypurecloud.com");
        assert_eq!(config.retry.to_policy(), RetryPolicy::default());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_default_config_needs_credentials() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("Missing credentials"));
        assert!(with_token().validate().is_ok());
    }

    #[test]
    fn test_explicit_urls_win_over_region() {
        let mut config = with_token();
        config.api.region = "nowhere".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = Some("http://localhost:8080/".to_string());
        config.api.login_url = Some("http://localhost:8081".to_string());
        assert_eq!(config.api.base_url().unwrap(), "http://localhost:8080");
        assert_eq!(config.api.token_url().unwrap(), "http://localhost:8081/oauth/token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_credentials() {
        let mut config = Config::default();
        config.api.region = "eu-central-1".to_string();
        config.api.client_id = Some("id".to_string());
        config.api.client_secret = Some("secret".to_string());

        match config.api.credentials().unwrap() {
            Credentials::ClientCredentials { token_url, .. } => {
                assert_eq!(token_url, "https://login.mypurecloud.de/oauth/token");
            }
            other => panic!("expected client credentials, got {other:?}"),
        }
        assert_eq!(config.api.auth_mode(), "client_credentials");
    }

    #[test]
    fn test_config_validation() {
        let mut config = with_token();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = with_token();
        config.retry.patch_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = with_token();
        config.api.base_url = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_override() {
        env::set_var("GENESYSCLOUD_API_URL", "http://127.0.0.1:9999");
        let config = Config::default().merge_with_env();
        assert_eq!(config.api.base_url.as_deref(), Some("http://127.0.0.1:9999"));
        env::remove_var("GENESYSCLOUD_API_URL");
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = with_token();
        config.api.client_secret = Some("hunter2".to_string());
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("\"token\""));
    }
}
