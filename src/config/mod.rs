//! # Configuration
//!
//! Runtime configuration for the settings factory itself: cache sizing, where
//! section sources live and how logging is set up. This is separate from the
//! configuration *sections* that describe containers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use section_settings::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Environment-specific defaults, then the file, then SECTION_SETTINGS__* overrides
//! let config = ConfigLoader::new().load(Some("config/section-settings.toml".as_ref()))?;
//! config.log_configuration();
//! # Ok(())
//! # }
//! ```

pub mod loader;

pub use loader::ConfigLoader;

use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::error::{SetupError, SetupResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SetupConfig {
    pub cache: CacheConfig,
    pub sources: SourceConfig,
    pub logging: LoggingConfig,
}

impl SetupConfig {
    /// Preset for a named environment (`test`, `development`, anything else is production)
    pub fn for_environment(environment: &str) -> Self {
        let (cache, level) = match environment {
            "test" => (CacheConfig::for_test(), "debug"),
            "development" => (CacheConfig::for_development(), "debug"),
            _ => (CacheConfig::default(), "info"),
        };
        Self {
            cache,
            sources: SourceConfig::default(),
            logging: LoggingConfig {
                level: level.to_string(),
                json: environment == "production",
            },
        }
    }

    pub fn validate(&self) -> SetupResult<()> {
        self.cache.validate()?;
        self.logging.validate()?;
        if let Some(path) = &self.sources.path {
            if path.as_os_str().is_empty() {
                return Err(SetupError::Configuration(
                    "sources.path must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Log current configuration for debugging
    pub fn log_configuration(&self) {
        info!("Section Settings Configuration:");
        info!("  Cache Capacity: {} sections", self.cache.capacity);
        match &self.sources.path {
            Some(path) => info!("  Section Source: {}", path.display()),
            None => info!("  Section Source: <programmatic>"),
        }
        info!(
            "  Logging: level={}, json={}",
            self.logging.level, self.logging.json
        );
    }
}

/// Sizing of the settings cache
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of sections kept at once
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Small cache so eviction paths are exercised in tests
    pub fn for_test() -> Self {
        Self { capacity: 16 }
    }

    pub fn for_development() -> Self {
        Self { capacity: 256 }
    }

    pub fn validate(&self) -> SetupResult<()> {
        if self.capacity == 0 {
            return Err(SetupError::invalid_argument(
                "cache capacity must be greater than 0",
            ));
        }
        if self.capacity < 4 {
            warn!(
                capacity = self.capacity,
                "Very small settings cache - sections will be rebuilt frequently"
            );
        }
        Ok(())
    }
}

/// Location of the file holding configuration sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> SetupResult<()> {
        if self.level.trim().is_empty() {
            return Err(SetupError::Configuration(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_presets() {
        assert_eq!(SetupConfig::for_environment("test").cache, CacheConfig::for_test());
        assert_eq!(
            SetupConfig::for_environment("development").cache.capacity,
            256
        );

        let production = SetupConfig::for_environment("production");
        assert_eq!(production.cache.capacity, DEFAULT_CACHE_CAPACITY);
        assert!(production.logging.json);
        assert_eq!(production.logging.level, "info");
    }

    #[test]
    fn test_validation() {
        assert!(SetupConfig::default().validate().is_ok());

        let mut config = SetupConfig::default();
        config.cache.capacity = 0;
        assert!(matches!(config.validate(), Err(SetupError::InvalidArgument(_))));

        let mut config = SetupConfig::default();
        config.logging.level = "  ".to_string();
        assert!(matches!(config.validate(), Err(SetupError::Configuration(_))));

        let mut config = SetupConfig::default();
        config.sources.path = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: SetupConfig =
            serde_json::from_str(r#"{ "cache": { "capacity": 8 } }"#).unwrap();
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.sources.path.is_none());
    }
}
