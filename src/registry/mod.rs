//! # Registry Infrastructure
//!
//! Containers, resolution and the cached settings factory.
//!
//! ## Overview
//!
//! A configuration section is turned into a [`Resolver`] by a configurator.
//! [`ServiceRegistry`] is the bundled resolver; [`SettingsFactory`] caches one
//! [`Settings`](crate::Settings) per section, and the accessors give typed
//! handles over a single `Settings`.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── Resolver           (object-safe container boundary)
//! ├── ServiceRegistry    (instances, factories, owned resources)
//! ├── SettingsFactory    (bounded cache of section settings)
//! └── Accessors          (ObjectFactory / CollectionFactory)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use section_settings::configurator::ProgrammaticConfigurator;
//! use section_settings::registry::{CollectionFactory, SettingsFactory};
//!
//! # fn example() -> section_settings::SetupResult<()> {
//! let factory = SettingsFactory::new(ProgrammaticConfigurator::new(|_section, registry| {
//!     registry
//!         .register_named_instance("primary", 25_u16)
//!         .register_named_instance("fallback", 2525_u16);
//!     Ok(())
//! }));
//!
//! let ports: CollectionFactory<u16> = factory.collection_factory("Mail")?;
//! assert_eq!(ports.get_to_map()?.len(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod accessors;
pub mod resolver;
pub mod service_registry;
pub mod settings_factory;

// Re-export main types for easy access
pub use accessors::{CollectionFactory, ObjectFactory};
pub use resolver::{resolve_as, Instance, Resolver, TypeKey};
pub use service_registry::ServiceRegistry;
pub use settings_factory::SettingsFactory;
