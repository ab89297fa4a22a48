//! # Resolver Boundary
//!
//! Object-safe contract for a dependency container. Settings only ever talk to
//! a container through this trait, so any container (the bundled
//! [`ServiceRegistry`](super::ServiceRegistry) or an adapter over another one)
//! can back a configuration section.

use crate::error::{SetupError, SetupResult};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased instance produced by a resolver
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Identity of a registered type
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Container capability consumed by [`Settings`](crate::Settings)
///
/// `name == None` always denotes the default (unnamed) registration.
pub trait Resolver: Send + Sync {
    /// Produce the instance registered for `key` under `name`
    fn resolve(&self, key: TypeKey, name: Option<&str>) -> SetupResult<Instance>;

    /// Produce one instance per named registration of `key`, in registration order.
    /// The default registration is not included.
    fn resolve_all(&self, key: TypeKey) -> SetupResult<Vec<Instance>>;

    fn is_registered(&self, key: TypeKey, name: Option<&str>) -> bool;

    /// Names under which `key` is registered; `None` is the default registration
    fn registered_names(&self, key: TypeKey) -> Vec<Option<String>>;

    /// Release everything the container owns
    fn dispose(&self) -> SetupResult<()>;
}

/// Resolve `T` from a type-erased resolver and downcast it
pub fn resolve_as<T: Send + Sync + 'static>(
    resolver: &dyn Resolver,
    name: Option<&str>,
) -> SetupResult<Arc<T>> {
    let key = TypeKey::of::<T>();
    let instance = resolver.resolve(key, name)?;
    downcast::<T>(instance)
}

pub(crate) fn downcast<T: Send + Sync + 'static>(instance: Instance) -> SetupResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| SetupError::TypeMismatch {
        type_name: std::any::type_name::<T>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
        assert_ne!(TypeKey::of::<String>(), TypeKey::of::<u32>());
        assert_eq!(TypeKey::of::<u32>().type_name(), "u32");
    }

    #[test]
    fn test_downcast_mismatch() {
        let instance: Instance = Arc::new(7u32);
        let result = downcast::<String>(instance);
        assert!(matches!(result, Err(SetupError::TypeMismatch { .. })));
    }
}
