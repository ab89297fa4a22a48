//! Configuration Loader
//!
//! Environment-aware loading of [`SetupConfig`]. Layers, lowest priority first:
//! the preset for the detected environment, an optional file in any format the
//! `config` crate reads, then `SECTION_SETTINGS__<SECTION>__<KEY>` variables.

use super::SetupConfig;
use crate::constants::{ENV_PREFIX, ENV_SEPARATOR};
use crate::error::SetupResult;
use crate::logging::get_environment;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config::builder::DefaultState;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    environment: String,
    env_source: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader for the environment detected from the process
    pub fn new() -> Self {
        Self::for_environment(get_environment())
    }

    /// Loader with an explicit environment, useful for tests
    pub fn for_environment(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            env_source: None,
        }
    }

    /// Read overrides from `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Load configuration, reading `path` when given
    pub fn load(&self, path: Option<&Path>) -> SetupResult<SetupConfig> {
        let mut builder = self.defaults()?;
        if let Some(path) = path {
            debug!(
                "Loading configuration for environment '{}' from: {}",
                self.environment,
                path.display()
            );
            builder = builder.add_source(File::from(path).required(true));
        }
        self.finish(builder)
    }

    /// Load configuration from TOML text instead of a file
    pub fn load_toml_str(&self, source: &str) -> SetupResult<SetupConfig> {
        let builder = self
            .defaults()?
            .add_source(File::from_str(source, FileFormat::Toml));
        self.finish(builder)
    }

    fn defaults(&self) -> SetupResult<ConfigBuilder<DefaultState>> {
        let preset = SetupConfig::for_environment(&self.environment);
        let capacity = i64::try_from(preset.cache.capacity).unwrap_or(i64::MAX);
        Ok(Config::builder()
            .set_default("cache.capacity", capacity)?
            .set_default("logging.level", preset.logging.level)?
            .set_default("logging.json", preset.logging.json)?)
    }

    fn finish(&self, builder: ConfigBuilder<DefaultState>) -> SetupResult<SetupConfig> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(self.env_source.clone());

        let config: SetupConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SetupError;

    fn isolated(environment: &str) -> ConfigLoader {
        ConfigLoader::for_environment(environment).with_env_source(HashMap::new())
    }

    #[test]
    fn test_environment_preset_without_sources() {
        let config = isolated("test").load(None).unwrap();
        assert_eq!(config, SetupConfig::for_environment("test"));
    }

    #[test]
    fn test_file_values_override_preset() {
        let config = isolated("test")
            .load_toml_str("[cache]\ncapacity = 3\n[logging]\njson = true\n")
            .unwrap();
        assert_eq!(config.cache.capacity, 3);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides_file() {
        let vars = HashMap::from([(
            "SECTION_SETTINGS__CACHE__CAPACITY".to_string(),
            "7".to_string(),
        )]);
        let config = ConfigLoader::for_environment("production")
            .with_env_source(vars)
            .load_toml_str("[cache]\ncapacity = 3\n")
            .unwrap();
        assert_eq!(config.cache.capacity, 7);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = isolated("production").load_toml_str("[cache]\ncapacity = 0\n");
        assert!(matches!(result, Err(SetupError::InvalidArgument(_))));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = isolated("test").load(Some(Path::new("/nonexistent/section-settings.toml")));
        assert!(matches!(result, Err(SetupError::Configuration(_))));
    }
}
