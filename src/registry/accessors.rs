//! Typed accessors over one [`Settings`] instance.
//!
//! Both wrappers only forward to `Settings`; they add no caching of their own.

use crate::error::SetupResult;
use crate::settings::Settings;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Resolves a single registration of `T`, either the default one or a named one
pub struct ObjectFactory<T> {
    settings: Arc<Settings>,
    name: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ObjectFactory<T> {
    /// Accessor for the default registration
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            name: None,
            _marker: PhantomData,
        }
    }

    /// Accessor for the registration named `name`
    pub fn named(settings: Arc<Settings>, name: impl Into<String>) -> Self {
        Self {
            settings,
            name: Some(name.into()),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get(&self) -> SetupResult<Arc<T>> {
        self.settings.resolve_one::<T>(self.name.as_deref())
    }

    pub fn is_defined(&self) -> SetupResult<bool> {
        self.settings.is_registered::<T>(self.name.as_deref())
    }
}

impl<T> Clone for ObjectFactory<T> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ObjectFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("type", &std::any::type_name::<T>())
            .field("section", &self.settings.section_name())
            .field("name", &self.name)
            .finish()
    }
}

/// Resolves every named registration of `T`
pub struct CollectionFactory<T> {
    settings: Arc<Settings>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> CollectionFactory<T> {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> SetupResult<Vec<Arc<T>>> {
        self.settings.resolve_all::<T>()
    }

    pub fn get_to_map(&self) -> SetupResult<HashMap<String, Arc<T>>> {
        self.settings.resolve_all_named::<T>()
    }

    /// True when at least one named registration of `T` exists
    pub fn is_defined(&self) -> SetupResult<bool> {
        Ok(self
            .settings
            .registered_names::<T>()?
            .iter()
            .any(Option::is_some))
    }
}

impl<T> Clone for CollectionFactory<T> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CollectionFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionFactory")
            .field("type", &std::any::type_name::<T>())
            .field("section", &self.settings.section_name())
            .finish()
    }
}
