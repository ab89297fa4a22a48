//! # Structured Logging Module
//!
//! Environment-aware structured logging for the settings cache and its
//! configurators. Output goes to the console, either human readable or JSON.

use crate::config::LoggingConfig;
use crate::constants::ENVIRONMENT_VARIABLES;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific defaults
pub fn init_structured_logging() {
    let environment = get_environment();
    let config = LoggingConfig {
        level: get_log_level(&environment),
        json: environment == "production",
    };
    init_logging(&config);
}

/// Initialize structured logging from explicit configuration. Only the first call has an effect.
pub fn init_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.level));
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true);

        let result = if config.json {
            tracing_subscriber::registry()
                .with(layer.json().with_filter(filter))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(layer.with_ansi(true).with_filter(filter))
                .try_init()
        };

        // Embedding applications may have installed their own subscriber
        if result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %config.level,
            json = config.json,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    environment_from(|name| std::env::var(name).ok())
}

fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    ENVIRONMENT_VARIABLES
        .iter()
        .find_map(|name| lookup(name))
        .unwrap_or_else(|| "development".to_string())
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for cache operations
pub fn log_cache_operation(operation: &str, key: &str, status: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        key = %key,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "CACHE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection_order() {
        let env = environment_from(|name| match name {
            "APP_ENV" => Some("staging".to_string()),
            "RUST_ENV" => Some("test".to_string()),
            _ => None,
        });
        assert_eq!(env, "staging");

        assert_eq!(environment_from(|_| None), "development");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&config);
        init_structured_logging();
        log_cache_operation("test", "Mail", "ok", None);
    }
}
