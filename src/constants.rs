//! # Constants
//!
//! Capacities, environment variable names and labels shared across modules.

/// Cache capacity used by factories built around a caller-supplied configurator
pub const DEFAULT_CACHE_CAPACITY: usize = 2048;

/// Cache capacity used by factories built around the section-reading configurator
pub const DEFAULT_SECTION_CACHE_CAPACITY: usize = 4096;

/// Prefix for environment overrides of [`crate::config::SetupConfig`]
pub const ENV_PREFIX: &str = "SECTION_SETTINGS";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Environment variables consulted, in order, to detect the runtime environment
pub const ENVIRONMENT_VARIABLES: [&str; 3] = ["SECTION_SETTINGS_ENV", "APP_ENV", "RUST_ENV"];

/// Key under which a section lists its registrations
pub const REGISTRATIONS_KEY: &str = "registrations";

pub mod targets {
    pub const SETTINGS_CACHE: &str = "settings cache";
    pub const SERVICE_REGISTRY: &str = "service registry";
}
