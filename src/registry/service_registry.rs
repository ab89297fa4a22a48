//! # Service Registry
//!
//! In-memory [`Resolver`] populated by configurators.
//!
//! ## Key Features
//!
//! - **Shared instances** registered once and handed out as `Arc<T>`
//! - **Factories** producing a fresh instance on every resolve, with access to
//!   the registry for their own dependencies
//! - **Named registrations** alongside the default (unnamed) one
//! - **Disposal hooks** run once, newest first, when the registry is disposed
//!
//! ## Usage
//!
//! ```rust
//! use section_settings::registry::{resolve_as, Resolver, ServiceRegistry};
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register_instance(8080u16);
//! registry.register_named_instance("admin", 9090u16);
//!
//! let port = resolve_as::<u16>(&registry, None).unwrap();
//! assert_eq!(*port, 8080);
//! assert_eq!(registry.registered_names(section_settings::registry::TypeKey::of::<u16>()).len(), 2);
//! ```

use super::resolver::{Instance, Resolver, TypeKey};
use crate::constants::targets;
use crate::error::{SetupError, SetupResult};
use crate::lifecycle::Dispose;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type FactoryFn = Arc<dyn Fn(&dyn Resolver) -> SetupResult<Instance> + Send + Sync>;
type DisposeHook = Box<dyn FnOnce() -> SetupResult<()> + Send>;

#[derive(Clone)]
enum Provider {
    Shared(Instance),
    Factory(FactoryFn),
}

struct Registration {
    key: TypeKey,
    name: Option<String>,
    provider: Provider,
}

/// Registry of shared instances and factories keyed by type and optional name
pub struct ServiceRegistry {
    registrations: Vec<Registration>,
    hooks: Mutex<Vec<DisposeHook>>,
    disposed: AtomicBool,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            hooks: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Register `value` as the default instance of `T`
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.register_shared(None, Arc::new(value))
    }

    /// Register `value` as the instance of `T` named `name`
    pub fn register_named_instance<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.register_shared(Some(name.into()), Arc::new(value))
    }

    /// Register an already shared instance
    pub fn register_shared<T: Send + Sync + 'static>(
        &mut self,
        name: Option<String>,
        value: Arc<T>,
    ) -> &mut Self {
        let instance: Instance = value;
        self.insert(TypeKey::of::<T>(), name, Provider::Shared(instance))
    }

    /// Register a factory invoked on every resolve of `T`
    pub fn register_factory<T, F>(&mut self, name: Option<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn Resolver) -> SetupResult<T> + Send + Sync + 'static,
    {
        let erased: FactoryFn = Arc::new(move |resolver: &dyn Resolver| {
            let value = factory(resolver)?;
            Ok(Arc::new(value) as Instance)
        });
        self.insert(TypeKey::of::<T>(), name, Provider::Factory(erased))
    }

    /// Register an instance that is disposed together with the registry
    pub fn register_owned<T: Dispose + 'static>(
        &mut self,
        name: Option<String>,
        value: T,
    ) -> &mut Self {
        let shared = Arc::new(value);
        let owned = Arc::clone(&shared);
        self.hooks.get_mut().push(Box::new(move || owned.dispose()));
        self.register_shared(name, shared)
    }

    /// Run `hook` when the registry is disposed
    pub fn on_dispose<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce() -> SetupResult<()> + Send + 'static,
    {
        self.hooks.get_mut().push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn insert(&mut self, key: TypeKey, name: Option<String>, provider: Provider) -> &mut Self {
        let existing = self
            .registrations
            .iter_mut()
            .find(|r| r.key == key && r.name == name);

        match existing {
            Some(registration) => {
                debug!(type_name = key.type_name(), name = ?name, "Replacing registration");
                registration.provider = provider;
            }
            None => self.registrations.push(Registration {
                key,
                name,
                provider,
            }),
        }
        self
    }

    fn ensure_live(&self) -> SetupResult<()> {
        if self.is_disposed() {
            return Err(SetupError::use_after_dispose(targets::SERVICE_REGISTRY));
        }
        Ok(())
    }

    fn instantiate(&self, provider: &Provider) -> SetupResult<Instance> {
        match provider {
            Provider::Shared(instance) => Ok(Arc::clone(instance)),
            Provider::Factory(factory) => factory(self),
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for ServiceRegistry {
    fn resolve(&self, key: TypeKey, name: Option<&str>) -> SetupResult<Instance> {
        self.ensure_live()?;
        let registration = self
            .registrations
            .iter()
            .find(|r| r.key == key && r.name.as_deref() == name)
            .ok_or_else(|| SetupError::not_registered(key.type_name(), name))?;
        self.instantiate(&registration.provider)
    }

    fn resolve_all(&self, key: TypeKey) -> SetupResult<Vec<Instance>> {
        self.ensure_live()?;
        self.registrations
            .iter()
            .filter(|r| r.key == key && r.name.is_some())
            .map(|r| self.instantiate(&r.provider))
            .collect()
    }

    fn is_registered(&self, key: TypeKey, name: Option<&str>) -> bool {
        !self.is_disposed()
            && self
                .registrations
                .iter()
                .any(|r| r.key == key && r.name.as_deref() == name)
    }

    fn registered_names(&self, key: TypeKey) -> Vec<Option<String>> {
        if self.is_disposed() {
            return Vec::new();
        }
        self.registrations
            .iter()
            .filter(|r| r.key == key)
            .map(|r| r.name.clone())
            .collect()
    }

    fn dispose(&self) -> SetupResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let hooks = std::mem::take(&mut *self.hooks.lock());
        debug!(hooks = hooks.len(), "Disposing service registry");

        let mut first_error = None;
        for hook in hooks.into_iter().rev() {
            if let Err(e) = hook() {
                warn!(error = %e, "Disposal hook failed");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<_> = self
            .registrations
            .iter()
            .map(|r| (r.key.type_name(), r.name.as_deref()))
            .collect();
        f.debug_struct("ServiceRegistry")
            .field("registrations", &entries)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
