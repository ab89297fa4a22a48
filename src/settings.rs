//! # Settings
//!
//! Typed view over the container built for one configuration section.
//!
//! A `Settings` owns exactly one [`Resolver`] and releases it exactly once.
//! Queries hold a read lock on the resolver slot, so disposal waits for
//! in-progress resolution and every query issued afterwards fails with
//! [`SetupError::UseAfterDispose`].

use crate::configurator::Configurator;
use crate::error::{ensure_section_name, SetupError, SetupResult};
use crate::lifecycle::Dispose;
use crate::registry::resolver::{downcast, Resolver, TypeKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dependency container loaded from a named configuration section
pub struct Settings {
    section: String,
    resolver: RwLock<Option<Box<dyn Resolver>>>,
}

impl Settings {
    /// Build settings for `section` using `configurator`
    pub fn load(section: &str, configurator: &dyn Configurator) -> SetupResult<Self> {
        ensure_section_name(section)?;
        let resolver = configurator.configure(section)?;
        debug!(section = %section, "Loaded settings");
        Ok(Self::from_resolver(section, resolver))
    }

    /// Wrap an already configured resolver
    pub fn from_resolver(section: impl Into<String>, resolver: Box<dyn Resolver>) -> Self {
        Self {
            section: section.into(),
            resolver: RwLock::new(Some(resolver)),
        }
    }

    /// Name of the configuration section these settings were built from
    pub fn section_name(&self) -> &str {
        &self.section
    }

    /// Resolve the default registration of `T`
    pub fn resolve<T: Send + Sync + 'static>(&self) -> SetupResult<Arc<T>> {
        self.resolve_one(None)
    }

    /// Resolve the registration of `T` named `name`
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> SetupResult<Arc<T>> {
        self.resolve_one(Some(name))
    }

    pub fn resolve_one<T: Send + Sync + 'static>(&self, name: Option<&str>) -> SetupResult<Arc<T>> {
        self.with_resolver(|resolver| downcast::<T>(resolver.resolve(TypeKey::of::<T>(), name)?))
    }

    /// Resolve every named registration of `T`
    pub fn resolve_all<T: Send + Sync + 'static>(&self) -> SetupResult<Vec<Arc<T>>> {
        self.with_resolver(|resolver| {
            resolver
                .resolve_all(TypeKey::of::<T>())?
                .into_iter()
                .map(downcast::<T>)
                .collect()
        })
    }

    /// Resolve every named registration of `T`, keyed by registration name.
    /// The default registration is excluded.
    pub fn resolve_all_named<T: Send + Sync + 'static>(
        &self,
    ) -> SetupResult<HashMap<String, Arc<T>>> {
        let key = TypeKey::of::<T>();
        self.with_resolver(|resolver| {
            resolver
                .registered_names(key)
                .into_iter()
                .flatten()
                .map(|name| {
                    let instance = downcast::<T>(resolver.resolve(key, Some(&name))?)?;
                    Ok((name, instance))
                })
                .collect()
        })
    }

    pub fn is_registered<T: Send + Sync + 'static>(&self, name: Option<&str>) -> SetupResult<bool> {
        self.with_resolver(|resolver| Ok(resolver.is_registered(TypeKey::of::<T>(), name)))
    }

    /// Names under which `T` is registered; `None` stands for the default registration
    pub fn registered_names<T: Send + Sync + 'static>(&self) -> SetupResult<Vec<Option<String>>> {
        self.with_resolver(|resolver| Ok(resolver.registered_names(TypeKey::of::<T>())))
    }

    pub fn is_disposed(&self) -> bool {
        self.resolver.read().is_none()
    }

    fn with_resolver<R>(&self, f: impl FnOnce(&dyn Resolver) -> SetupResult<R>) -> SetupResult<R> {
        let guard = self.resolver.read();
        match guard.as_deref() {
            Some(resolver) => f(resolver),
            None => Err(SetupError::use_after_dispose(format!(
                "settings for section '{}'",
                self.section
            ))),
        }
    }
}

impl Dispose for Settings {
    fn dispose(&self) -> SetupResult<()> {
        let Some(resolver) = self.resolver.write().take() else {
            return Ok(());
        };
        debug!(section = %self.section, "Disposing settings");
        resolver.dispose()
    }
}

impl Drop for Settings {
    fn drop(&mut self) {
        if let Some(resolver) = self.resolver.get_mut().take() {
            if let Err(e) = resolver.dispose() {
                warn!(section = %self.section, error = %e, "Failed to dispose settings on drop");
            }
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("section", &self.section)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
