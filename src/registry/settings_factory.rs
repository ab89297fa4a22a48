//! # Settings Factory
//!
//! Creates [`Settings`] per configuration section and keeps them in a bounded
//! [`ResourceCache`].
//!
//! ## Overview
//!
//! The factory is the entry point applications hold on to. The first request
//! for a section runs the configurator once; later requests return the same
//! `Arc<Settings>` until the entry is evicted or flushed. Evicted and flushed
//! settings are disposed, so callers should not hold on to them across a flush.
//!
//! ## Usage
//!
//! ```rust
//! use section_settings::configurator::ProgrammaticConfigurator;
//! use section_settings::registry::SettingsFactory;
//!
//! # fn example() -> section_settings::SetupResult<()> {
//! let factory = SettingsFactory::new(ProgrammaticConfigurator::new(|section, registry| {
//!     registry.register_instance(format!("settings for {section}"));
//!     Ok(())
//! }));
//!
//! let mail = factory.get("Mail")?;
//! assert_eq!(*mail.resolve::<String>()?, "settings for Mail");
//! assert!(factory.flush("Mail")?);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::cache::{CacheStats, ResourceCache};
use crate::config::CacheConfig;
use crate::configurator::{Configurator, DefaultConfigurator};
use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_SECTION_CACHE_CAPACITY};
use crate::error::SetupResult;
use crate::registry::accessors::{CollectionFactory, ObjectFactory};
use crate::settings::Settings;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::info;

/// Factory for section settings backed by a bounded cache
pub struct SettingsFactory {
    cache: ResourceCache<Settings>,
}

impl SettingsFactory {
    /// Create a factory around a caller-supplied configurator
    pub fn new(configurator: impl Configurator + 'static) -> Self {
        Self::with_nonzero_capacity(Arc::new(configurator), DEFAULT_CAPACITY)
    }

    /// Create a factory reading sections through a [`DefaultConfigurator`]
    pub fn with_default_configurator(configurator: DefaultConfigurator) -> Self {
        Self::with_nonzero_capacity(Arc::new(configurator), DEFAULT_SECTION_CAPACITY)
    }

    /// Create a factory with an explicit capacity, rejecting zero
    pub fn with_capacity(configurator: Arc<dyn Configurator>, capacity: usize) -> SetupResult<Self> {
        let cache = ResourceCache::with_capacity(capacity, section_builder(configurator))?;
        info!(capacity, "Settings factory created");
        Ok(Self { cache })
    }

    /// Create a factory sized from loaded configuration
    pub fn from_config(
        config: &CacheConfig,
        configurator: Arc<dyn Configurator>,
    ) -> SetupResult<Self> {
        config.validate()?;
        Self::with_capacity(configurator, config.capacity)
    }

    fn with_nonzero_capacity(configurator: Arc<dyn Configurator>, capacity: NonZeroUsize) -> Self {
        info!(capacity = capacity.get(), "Settings factory created");
        Self {
            cache: ResourceCache::new(capacity, section_builder(configurator)),
        }
    }

    /// Settings for `section`, loading them on first use
    pub fn get(&self, section: &str) -> SetupResult<Arc<Settings>> {
        self.cache.get(section)
    }

    /// Dispose and forget the settings for `section`. Returns whether they were cached.
    pub fn flush(&self, section: &str) -> SetupResult<bool> {
        self.cache.flush(section)
    }

    /// Dispose and forget every cached section
    pub fn flush_all(&self) -> SetupResult<()> {
        self.cache.flush_all()
    }

    /// Dispose every cached section and refuse further requests
    pub fn dispose(&self) -> SetupResult<()> {
        self.cache.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.cache.is_disposed()
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Accessor for the default (or `name`d) registration of `T` in `section`
    pub fn object_factory<T: Send + Sync + 'static>(
        &self,
        section: &str,
        name: Option<&str>,
    ) -> SetupResult<ObjectFactory<T>> {
        let settings = self.get(section)?;
        Ok(match name {
            Some(name) => ObjectFactory::named(settings, name),
            None => ObjectFactory::new(settings),
        })
    }

    /// Accessor for the named registrations of `T` in `section`
    pub fn collection_factory<T: Send + Sync + 'static>(
        &self,
        section: &str,
    ) -> SetupResult<CollectionFactory<T>> {
        Ok(CollectionFactory::new(self.get(section)?))
    }
}

impl fmt::Debug for SettingsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsFactory")
            .field("cache", &self.cache)
            .finish()
    }
}

fn section_builder(
    configurator: Arc<dyn Configurator>,
) -> impl Fn(&str) -> SetupResult<Settings> + Send + Sync + 'static {
    move |section: &str| Settings::load(section, configurator.as_ref())
}

const DEFAULT_CAPACITY: NonZeroUsize = nonzero_capacity(DEFAULT_CACHE_CAPACITY);
const DEFAULT_SECTION_CAPACITY: NonZeroUsize = nonzero_capacity(DEFAULT_SECTION_CACHE_CAPACITY);

/// Evaluated in const context, so a zero default fails the build
const fn nonzero_capacity(capacity: usize) -> NonZeroUsize {
    match NonZeroUsize::new(capacity) {
        Some(capacity) => capacity,
        None => panic!("default cache capacity must be greater than 0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::ProgrammaticConfigurator;
    use crate::error::SetupError;
    use crate::registry::ServiceRegistry;

    fn echo() -> ProgrammaticConfigurator {
        ProgrammaticConfigurator::new(|section: &str, registry: &mut ServiceRegistry| {
            registry.register_instance(section.to_string());
            Ok(())
        })
    }

    #[test]
    fn test_settings_factory_creation() {
        let factory = SettingsFactory::new(echo());
        assert_eq!(factory.capacity(), DEFAULT_CACHE_CAPACITY);

        let stats = factory.cache_stats();
        assert_eq!(stats.entries, 0);
        assert!(stats.keys.is_empty());
    }

    #[test]
    fn test_default_configurator_capacity() {
        let configurator =
            DefaultConfigurator::from_toml_str("[mail]\n", Default::default()).unwrap();
        let factory = SettingsFactory::with_default_configurator(configurator);
        assert_eq!(factory.capacity(), DEFAULT_SECTION_CACHE_CAPACITY);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = SettingsFactory::with_capacity(Arc::new(echo()), 0);
        assert!(matches!(result, Err(SetupError::InvalidArgument(_))));

        let config = CacheConfig { capacity: 0 };
        assert!(SettingsFactory::from_config(&config, Arc::new(echo())).is_err());
    }

    #[test]
    fn test_cache_operations() {
        let factory = SettingsFactory::new(echo());
        let first = factory.get("Mail").unwrap();
        let second = factory.get("Mail").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first.resolve::<String>().unwrap(), "Mail");

        assert!(factory.flush("Mail").unwrap());
        assert!(first.is_disposed());
        assert!(!factory.flush("Mail").unwrap());

        factory.get("Mail").unwrap();
        factory.flush_all().unwrap();
        assert_eq!(factory.cache_stats().entries, 0);
    }

    #[test]
    fn test_accessors_from_factory() {
        let factory = SettingsFactory::new(echo());
        let object = factory.object_factory::<String>("Mail", None).unwrap();
        assert_eq!(*object.get().unwrap(), "Mail");

        let collection = factory.collection_factory::<String>("Mail").unwrap();
        assert!(!collection.is_defined().unwrap());
    }
}
