#![allow(clippy::doc_markdown)] // Allow technical terms like TOML, LRU in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Section Settings
//!
//! Dependency containers loaded from named configuration sections, served
//! through a bounded, thread-safe settings cache.
//!
//! ## Overview
//!
//! An application describes services per configuration section (for example
//! `mail` or `billing`). A [`Configurator`](configurator::Configurator) turns a
//! section name into a populated [`Resolver`](registry::Resolver); [`Settings`]
//! wraps that resolver with typed queries and explicit disposal; and
//! [`SettingsFactory`] caches one `Settings` per section so repeated requests
//! never re-read configuration.
//!
//! ## Key Features
//!
//! - **Single-flight construction**: concurrent first requests for a section run
//!   the configurator exactly once
//! - **Bounded memory**: least recently used sections are evicted and disposed
//! - **Explicit disposal**: resources owned by a section are released exactly
//!   once, on eviction, flush or factory disposal
//! - **Pluggable containers**: any type implementing `Resolver` can back a section
//!
//! ## Module Organization
//!
//! - [`cache`] - Bounded single-flight cache of disposable values
//! - [`settings`] - Typed view over one section's container
//! - [`registry`] - Resolver boundary, service registry, settings factory, accessors
//! - [`configurator`] - Section-reading and programmatic configurators
//! - [`config`] - Runtime configuration for the factory itself
//! - [`lifecycle`] - The `Dispose` contract
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust
//! use section_settings::configurator::{DefaultConfigurator, TypeCatalog};
//! use section_settings::SettingsFactory;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Retry {
//!     attempts: u32,
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut catalog = TypeCatalog::new();
//! catalog.bind::<Retry>("retry");
//!
//! let configurator = DefaultConfigurator::from_toml_str(
//!     r#"
//!     [billing]
//!     [[billing.registrations]]
//!     type = "retry"
//!     value = { attempts = 3 }
//!     "#,
//!     catalog,
//! )?;
//!
//! let factory = SettingsFactory::with_default_configurator(configurator);
//! let billing = factory.get("billing")?;
//! assert_eq!(billing.resolve::<Retry>()?.attempts, 3);
//!
//! factory.dispose()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod cache;
pub mod config;
pub mod configurator;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod settings;

pub use cache::{CacheStats, ResourceCache};
pub use config::{CacheConfig, ConfigLoader, LoggingConfig, SetupConfig, SourceConfig};
pub use configurator::{
    Configurator, DefaultConfigurator, ProgrammaticConfigurator, SourceFormat, TypeCatalog,
};
pub use constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_SECTION_CACHE_CAPACITY};
pub use error::{SetupError, SetupResult};
pub use lifecycle::Dispose;
pub use logging::init_structured_logging;
pub use registry::{
    CollectionFactory, ObjectFactory, Resolver, ServiceRegistry, SettingsFactory, TypeKey,
};
pub use settings::Settings;
