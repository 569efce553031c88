//! Compiled templates and the engine that produces them.
//!
//! A [`Template`] is immutable once parsed: it shares its node tree and
//! registry through [`Arc`], so cloning is cheap and the same template can be
//! rendered from many threads at once. Every render builds its own
//! [`Context`] and guard.
//!
//! [`Engine`] ties a registry to an [`EngineConfig`] so hosts can parse and
//! render many templates with the same settings.
//!
//! # Examples
//!
//! ```rust
//! use liqrs::{Template, Value};
//!
//! let template = Template::parse("Hello {{ name | capitalize }}!").unwrap();
//! let data = Value::object([("name", "ada")]);
//! assert_eq!(template.render(&data).unwrap(), "Hello Ada!");
//! ```

use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::Serialize;

use crate::ast::Document;
use crate::config::{EngineConfig, Flavor, ParseSettings, ProtectionSettings, parse_config};
use crate::context::{Context, Object, Value};
use crate::core::{Error, ParseError, RenderError};
use crate::parser::parse_document;
use crate::registry::Registry;
use crate::render::render_nodes;

static STANDARD_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::standard()));

/// Compile `source` with the standard tags and filters.
pub fn parse(source: &str, settings: &ParseSettings) -> Result<Template, ParseError> {
    Template::parse_with(source, settings, Arc::clone(&STANDARD_REGISTRY))
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    document: Arc<Document>,
    registry: Arc<Registry>,
    flavor: Flavor,
    protection: ProtectionSettings,
}

impl Template {
    /// Compile `source` with default settings and the standard registry.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        parse(source, &ParseSettings::default())
    }

    /// Compile `source` against a custom registry.
    pub fn parse_with(
        source: &str,
        settings: &ParseSettings,
        registry: Arc<Registry>,
    ) -> Result<Self, ParseError> {
        let document = parse_document(source, settings, &registry)?;
        Ok(Self {
            document: Arc::new(document),
            registry,
            flavor: settings.flavor,
            protection: ProtectionSettings::default(),
        })
    }

    /// Replace the limits used by [`Template::render`].
    #[must_use]
    pub fn with_protection(mut self, protection: ProtectionSettings) -> Self {
        self.protection = protection;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn protection(&self) -> &ProtectionSettings {
        &self.protection
    }

    /// Render with the template's own protection settings.
    ///
    /// `data` must be an object (its keys become top-level variables) or
    /// `nil` for a render without data.
    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        self.render_with(data, &self.protection)
    }

    /// Render with explicit protection settings.
    ///
    /// # Errors
    ///
    /// Any [`RenderError`]; when a protection limit trips the partial output
    /// is discarded.
    pub fn render_with(&self, data: &Value, protection: &ProtectionSettings) -> Result<String, RenderError> {
        let frame = match data {
            Value::Object(map) => map.clone(),
            Value::Nil => Object::new(),
            other => {
                return Err(RenderError::InvalidData {
                    message: format!("expected an object, got {}", other.type_name()),
                });
            }
        };

        let mut ctx = Context::new(frame, self.flavor, &self.registry, protection);
        let mut out = String::new();
        let result = render_nodes(&self.document.nodes, &mut ctx, &mut out);
        // A `break` outside any loop just ends the render.
        ctx.take_interrupt();

        match result {
            Ok(()) => {
                tracing::debug!(bytes = out.len(), flavor = ?self.flavor, "Rendered template");
                Ok(out)
            }
            Err(error) => {
                tracing::debug!(error = %error, "Render failed");
                Err(error)
            }
        }
    }

    /// Convert any serializable value to template data and render it.
    pub fn render_serialize<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, Error> {
        let value = Value::from_serialize(data)?;
        Ok(self.render(&value)?)
    }
}

/// A registry and configuration shared by many templates.
///
/// # Examples
///
/// ```rust
/// use liqrs::config::{EngineConfig, Flavor};
/// use liqrs::{Engine, Registry, Value};
///
/// let mut config = EngineConfig::default();
/// config.parse.flavor = Flavor::Strict;
/// let engine = Engine::new(Registry::standard(), config);
///
/// assert!(engine.render_str("{{ missing }}", &Value::Nil).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(registry: Registry, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// Create an engine with the standard registry and a TOML config file.
    pub fn from_config_file(path: &Path) -> Result<Self, Error> {
        let config: EngineConfig = parse_config(path).map_err(Error::Config)?;
        Ok(Self {
            registry: Arc::clone(&STANDARD_REGISTRY),
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile `source` with the engine's settings.
    ///
    /// The size limit is the stricter of the parse and protection limits.
    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        let settings = ParseSettings {
            max_size_bytes: self.config.effective_size_limit(),
            ..self.config.parse.clone()
        };
        Ok(Template::parse_with(source, &settings, Arc::clone(&self.registry))?
            .with_protection(self.config.protection))
    }

    /// Parse and render in one step.
    pub fn render_str(&self, source: &str, data: &Value) -> Result<String, Error> {
        Ok(self.parse(source)?.render(data)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            registry: Arc::clone(&STANDARD_REGISTRY),
            config: EngineConfig::default(),
        }
    }
}
