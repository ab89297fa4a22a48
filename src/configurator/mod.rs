//! # Configurators
//!
//! Strategies that turn a configuration section name into a populated
//! [`Resolver`].
//!
//! - [`DefaultConfigurator`] reads registrations from a structured config
//!   source, optionally followed by programmatic registrations
//! - [`ProgrammaticConfigurator`] registers services from code
//!
//! Configurators are handed to a [`SettingsFactory`](crate::SettingsFactory)
//! or to [`Settings::load`](crate::Settings::load) explicitly; there is no
//! process-wide registration.

pub mod section;

pub use section::{
    DefaultConfigurator, RegistrationSummary, SectionSummary, SourceFormat, TypeCatalog,
};

use crate::error::SetupResult;
use crate::registry::{Resolver, ServiceRegistry};
use std::fmt;

/// Builds a resolver for a named configuration section
pub trait Configurator: Send + Sync {
    fn configure(&self, section: &str) -> SetupResult<Box<dyn Resolver>>;
}

type RegisterFn = dyn Fn(&str, &mut ServiceRegistry) -> SetupResult<()> + Send + Sync;

/// Configurator that populates a fresh [`ServiceRegistry`] from code
pub struct ProgrammaticConfigurator {
    register: Box<RegisterFn>,
}

impl ProgrammaticConfigurator {
    pub fn new<F>(register: F) -> Self
    where
        F: Fn(&str, &mut ServiceRegistry) -> SetupResult<()> + Send + Sync + 'static,
    {
        Self {
            register: Box::new(register),
        }
    }
}

impl Configurator for ProgrammaticConfigurator {
    fn configure(&self, section: &str) -> SetupResult<Box<dyn Resolver>> {
        let mut registry = ServiceRegistry::new();
        (self.register)(section, &mut registry)?;
        Ok(Box::new(registry))
    }
}

impl fmt::Debug for ProgrammaticConfigurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgrammaticConfigurator").finish_non_exhaustive()
    }
}
