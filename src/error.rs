//! # Setup Errors
//!
//! Error taxonomy shared by configurators, resolvers, settings and the cache.
//!
//! `SetupError` is `Clone` so that a single failed construction can be handed
//! to every caller that was waiting on it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The named configuration section does not exist in the source
    #[error("The '{section}' configuration section is not defined")]
    SectionNotFound { section: String },

    /// The named section exists but does not describe a container
    #[error("The '{section}' configuration section is not a container section: {reason}")]
    SectionTypeMismatch { section: String, reason: String },

    /// No registration matches the requested type and name
    #[error("No registration for {type_name} under {}", .name.as_deref().unwrap_or("the default name"))]
    NotRegistered {
        type_name: &'static str,
        name: Option<String>,
    },

    /// A registration produced an instance of a different type
    #[error("Registration for {type_name} produced an instance of another type")]
    TypeMismatch { type_name: &'static str },

    /// Operation attempted on a disposed settings container, registry or cache
    #[error("{target} has already been disposed")]
    UseAfterDispose { target: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration source could not be read or a registration is malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Building a value for a cache key did not complete
    #[error("Failed to build settings for '{section}': {reason}")]
    Construction { section: String, reason: String },

    /// Releasing an owned resource reported a failure
    #[error("Failed to dispose {target}: {reason}")]
    Disposal { target: String, reason: String },
}

impl SetupError {
    pub fn section_not_found(section: impl Into<String>) -> Self {
        Self::SectionNotFound {
            section: section.into(),
        }
    }

    pub fn section_type_mismatch(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SectionTypeMismatch {
            section: section.into(),
            reason: reason.into(),
        }
    }

    pub fn not_registered(type_name: &'static str, name: Option<&str>) -> Self {
        Self::NotRegistered {
            type_name,
            name: name.map(str::to_owned),
        }
    }

    pub fn use_after_dispose(target: impl Into<String>) -> Self {
        Self::UseAfterDispose {
            target: target.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn disposal(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Disposal {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from a disposed object rather than bad input
    pub fn is_use_after_dispose(&self) -> bool {
        matches!(self, Self::UseAfterDispose { .. })
    }
}

impl From<config::ConfigError> for SetupError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Reject empty section names and cache keys before any work begins
pub(crate) fn ensure_section_name(section: &str) -> SetupResult<()> {
    if section.is_empty() {
        return Err(SetupError::invalid_argument(
            "configuration section name must not be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_registered_message_mentions_name() {
        let named = SetupError::not_registered("u32", Some("port"));
        assert_eq!(named.to_string(), "No registration for u32 under port");

        let default = SetupError::not_registered("u32", None);
        assert_eq!(
            default.to_string(),
            "No registration for u32 under the default name"
        );
    }

    #[test]
    fn test_empty_section_name_rejected() {
        assert!(matches!(
            ensure_section_name(""),
            Err(SetupError::InvalidArgument(_))
        ));
        assert!(ensure_section_name("Mail").is_ok());
    }

    #[test]
    fn test_config_error_conversion() {
        let error: SetupError = config::ConfigError::Message("bad source".to_string()).into();
        assert_eq!(error, SetupError::Configuration("bad source".to_string()));
    }
}
