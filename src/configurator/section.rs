//! # Section Configurator
//!
//! Reads container registrations from a structured configuration source.
//!
//! ## Overview
//!
//! Each top-level table of the source is a section. A section lists its
//! registrations under `registrations`; every registration names a type alias
//! bound in a [`TypeCatalog`], an optional registration name, and the value the
//! instance is deserialized from:
//!
//! ```toml
//! [mail]
//! [[mail.registrations]]
//! type = "smtp"
//! name = "primary"
//! value = { host = "smtp.example.org", port = 25 }
//! ```
//!
//! TOML, YAML and JSON sources are read through
//! [`DefaultConfigurator::from_file`]. Section names, registration names and
//! value fields keep their spelling, so `[Mail]` and `[mail]` are two sections.
//!
//! ## Usage
//!
//! ```rust
//! use section_settings::configurator::{DefaultConfigurator, TypeCatalog};
//! use section_settings::Settings;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Smtp {
//!     host: String,
//!     port: u16,
//! }
//!
//! let source = r#"
//! [mail]
//! [[mail.registrations]]
//! type = "smtp"
//! value = { host = "smtp.example.org", port = 25 }
//! "#;
//!
//! let mut catalog = TypeCatalog::new();
//! catalog.bind::<Smtp>("smtp");
//!
//! let configurator = DefaultConfigurator::from_toml_str(source, catalog).unwrap();
//! let settings = Settings::load("mail", &configurator).unwrap();
//! assert_eq!(settings.resolve::<Smtp>().unwrap().port, 25);
//! ```

use super::Configurator;
use crate::constants::REGISTRATIONS_KEY;
use crate::error::{ensure_section_name, SetupError, SetupResult};
use crate::registry::{Resolver, ServiceRegistry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

type BindFn = dyn Fn(&mut ServiceRegistry, Option<String>, Value) -> SetupResult<()> + Send + Sync;
type ExtendFn = dyn Fn(&str, &mut ServiceRegistry) -> SetupResult<()> + Send + Sync;

/// Maps type aliases used in configuration sections to Rust types
#[derive(Clone, Default)]
pub struct TypeCatalog {
    bindings: HashMap<String, Arc<BindFn>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to `T`, deserializing instances from the registration value
    pub fn bind<T>(&mut self, alias: &str) -> &mut Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_with(alias, |value: Value| {
            serde_json::from_value::<T>(value)
                .map_err(|e| SetupError::Configuration(e.to_string()))
        })
    }

    /// Bind `alias` to `T`, building instances with `build`
    pub fn bind_with<T, F>(&mut self, alias: &str, build: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(Value) -> SetupResult<T> + Send + Sync + 'static,
    {
        let owned_alias = alias.to_string();
        let binder = move |registry: &mut ServiceRegistry, name: Option<String>, value: Value| {
            let instance = build(value).map_err(|e| {
                SetupError::Configuration(format!(
                    "Cannot build '{owned_alias}' registration {}: {e}",
                    name.as_deref().unwrap_or("<default>")
                ))
            })?;
            registry.register_shared(name, Arc::new(instance));
            Ok(())
        };
        self.bindings.insert(alias.to_string(), Arc::new(binder));
        self
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.bindings.contains_key(alias)
    }

    fn get(&self, alias: &str) -> Option<&Arc<BindFn>> {
        self.bindings.get(alias)
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases: Vec<_> = self.bindings.keys().collect();
        aliases.sort();
        f.debug_struct("TypeCatalog").field("aliases", &aliases).finish()
    }
}

/// Text formats a section source can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Yaml,
    Json,
}

impl SourceFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> SetupResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(SetupError::Configuration(format!(
                "Cannot infer the section source format of {}",
                path.display()
            ))),
        }
    }

    fn parse(self, source: &str) -> SetupResult<Map<String, Value>> {
        match self {
            Self::Toml => toml::from_str(source).map_err(|e| parse_error(self, e)),
            Self::Yaml => serde_yaml::from_str(source).map_err(|e| parse_error(self, e)),
            Self::Json => serde_json::from_str(source).map_err(|e| parse_error(self, e)),
        }
    }
}

fn parse_error(format: SourceFormat, error: impl fmt::Display) -> SetupError {
    SetupError::Configuration(format!("Invalid {format:?} section source: {error}"))
}

#[derive(Debug, Deserialize)]
struct RegistrationSpec {
    #[serde(rename = "type")]
    type_alias: String,
    name: Option<String>,
    value: Option<Value>,
}

/// Shape of one registration, as reported by [`DefaultConfigurator::describe`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSummary {
    pub type_alias: String,
    pub name: Option<String>,
    pub bound: bool,
}

/// Shape of a section without building it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub section: String,
    pub registrations: Vec<RegistrationSummary>,
}

/// Configurator reading registrations from configuration sections
pub struct DefaultConfigurator {
    sections: Map<String, Value>,
    catalog: TypeCatalog,
    extension: Option<Arc<ExtendFn>>,
}

impl DefaultConfigurator {
    /// Read sections from a file; the format is inferred from the extension
    pub fn from_file(path: impl AsRef<Path>, catalog: TypeCatalog) -> SetupResult<Self> {
        let path = path.as_ref();
        info!("Loading configuration sections from: {}", path.display());
        let format = SourceFormat::from_path(path)?;
        let source = fs::read_to_string(path).map_err(|e| {
            SetupError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_source(&source, format, catalog)
    }

    /// Read sections from text in the given format
    pub fn from_source(
        source: &str,
        format: SourceFormat,
        catalog: TypeCatalog,
    ) -> SetupResult<Self> {
        let sections = format.parse(source)?;
        debug!(sections = sections.len(), format = ?format, "Section source loaded");
        Ok(Self {
            sections,
            catalog,
            extension: None,
        })
    }

    /// Read sections from TOML text
    pub fn from_toml_str(source: &str, catalog: TypeCatalog) -> SetupResult<Self> {
        Self::from_source(source, SourceFormat::Toml, catalog)
    }

    /// Add programmatic registrations after the section's own registrations
    pub fn with_extension<F>(mut self, extend: F) -> Self
    where
        F: Fn(&str, &mut ServiceRegistry) -> SetupResult<()> + Send + Sync + 'static,
    {
        self.extension = Some(Arc::new(extend));
        self
    }

    /// Names of all top-level entries, sorted
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.sections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Report the registrations of `section` without instantiating them
    pub fn describe(&self, section: &str) -> SetupResult<SectionSummary> {
        let registrations = self
            .registrations(section)?
            .into_iter()
            .map(|spec| RegistrationSummary {
                bound: self.catalog.contains(&spec.type_alias),
                type_alias: spec.type_alias,
                name: spec.name,
            })
            .collect();

        Ok(SectionSummary {
            section: section.to_string(),
            registrations,
        })
    }

    fn registrations(&self, section: &str) -> SetupResult<Vec<RegistrationSpec>> {
        ensure_section_name(section)?;
        let value = self
            .sections
            .get(section)
            .ok_or_else(|| SetupError::section_not_found(section))?;

        let Value::Object(table) = value else {
            return Err(SetupError::section_type_mismatch(
                section,
                format!("expected a table, found {}", kind_name(value)),
            ));
        };

        let Some(registrations) = table.get(REGISTRATIONS_KEY) else {
            return Ok(Vec::new());
        };

        if !registrations.is_array() {
            return Err(SetupError::section_type_mismatch(
                section,
                format!(
                    "'{REGISTRATIONS_KEY}' must be an array, found {}",
                    kind_name(registrations)
                ),
            ));
        }

        Vec::<RegistrationSpec>::deserialize(registrations)
            .map_err(|e| SetupError::section_type_mismatch(section, e.to_string()))
    }
}

impl Configurator for DefaultConfigurator {
    fn configure(&self, section: &str) -> SetupResult<Box<dyn Resolver>> {
        let specs = self.registrations(section)?;
        let mut registry = ServiceRegistry::new();

        for spec in specs {
            let binder = self.catalog.get(&spec.type_alias).ok_or_else(|| {
                SetupError::Configuration(format!(
                    "Section '{section}' uses unknown type alias '{}'",
                    spec.type_alias
                ))
            })?;
            let value = spec.value.unwrap_or_else(|| Value::Object(Map::new()));
            binder(&mut registry, spec.name, value)?;
        }

        if let Some(extend) = &self.extension {
            extend(section, &mut registry)?;
        }

        debug!(
            section = %section,
            registrations = registry.len(),
            "Configured container from section"
        );
        Ok(Box::new(registry))
    }
}

impl fmt::Debug for DefaultConfigurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultConfigurator")
            .field("sections", &self.section_names())
            .field("catalog", &self.catalog)
            .field("extended", &self.extension.is_some())
            .finish()
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Object(_) => "a table",
        Value::Array(_) => "an array",
        Value::String(_) => "a string",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
    }
}
