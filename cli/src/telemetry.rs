use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{Config, LogFormat, LoggingConfig};

/// Initialize the tracing subscriber.
///
/// Logs go to stderr; stdout carries command output only.
pub fn init_telemetry(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level configuration")?;

    let registry = Registry::default().with(env_filter);

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            registry.with(fmt_layer).init();
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_span_list(true)
                .flatten_event(true);

            registry.with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .with_line_number(false);

            registry.with(fmt_layer).init();
        }
    }

    tracing::debug!(
        log_level = %config.level,
        log_format = ?config.format,
        "Telemetry initialized"
    );

    Ok(())
}

/// Log where the CLI is about to connect
pub fn log_startup_info(config: &Config) {
    tracing::info!(
        region = %config.api.region,
        base_url = ?config.api.base_url().ok(),
        auth = config.api.auth_mode(),
        request_timeout_secs = config.api.request_timeout_secs,
        "taskmgmt starting"
    );
}

/// Log configuration validation
pub fn log_config_validation(config: &Config) {
    match config.validate() {
        Ok(()) => tracing::debug!("Configuration validation passed"),
        Err(e) => tracing::error!(error = %e, "Configuration validation failed"),
    }
}

/// Log an error with its whole cause chain
pub fn report_error(error: &anyhow::Error, context: &str) {
    tracing::error!(error = %error, context = context, "Command failed");

    for (depth, cause) in error.chain().skip(1).enumerate() {
        tracing::error!(error = %cause, depth = depth + 1, "Error cause");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_formats_deserialize() {
        for (raw, expected) in [("pretty", "Pretty"), ("json", "Json"), ("compact", "Compact")] {
            let format: LogFormat = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
            assert_eq!(format!("{format:?}"), expected);
        }
        assert!(serde_json::from_str::<LogFormat>("\"xml\"").is_err());
    }

    #[test]
    fn test_report_error_walks_chain() {
        // Only checks that walking the chain does not panic without a subscriber
        let error = anyhow::anyhow!("root cause").context("while applying worktype");
        report_error(&error, "worktype apply");
    }
}
