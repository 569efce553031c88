//! Named tag, filter and partial capabilities.
//!
//! The [`Registry`] is assembled with a consuming builder and then frozen
//! behind an [`Arc`] by [`Template`](crate::Template) or
//! [`Engine`](crate::Engine). Parsing consults it for tag shapes and partial
//! linking, rendering consults it for the capabilities themselves; neither
//! ever mutates it.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use liqrs::registry::{FilterArgs, Registry};
//! use liqrs::{Context, ParseSettings, Template, Value};
//!
//! fn shout(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> anyhow::Result<Value> {
//!     Ok(Value::from(format!("{}!", input.to_text().to_uppercase())))
//! }
//!
//! let registry = Registry::standard()
//!     .with_filter("shout", shout)
//!     .with_partial("greeting", "Hello {{ name | shout }}", &ParseSettings::default())
//!     .unwrap();
//!
//! let template =
//!     Template::parse_with("{% include 'greeting' %}", &ParseSettings::default(), Arc::new(registry))
//!         .unwrap();
//! let data = Value::object([("name", "world")]);
//! assert_eq!(template.render(&data).unwrap(), "Hello WORLD!");
//! ```

pub mod filters;
pub mod tags;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Document, TagArgs, TagCall};
use crate::config::ParseSettings;
use crate::context::{Context, Value};
use crate::core::{ParseError, RenderError};
use crate::parser::Markup;

/// How the parser treats a tag's surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagShape {
    /// A standalone directive
    Simple,
    /// Owns a body up to `end<name>`, split by the listed clause tags
    Block {
        clauses: &'static [&'static str],
    },
    /// Owns a verbatim body up to `end<name>`; nothing inside is parsed
    Raw,
}

/// A tag capability.
pub trait Tag: Send + Sync {
    fn shape(&self) -> TagShape {
        TagShape::Simple
    }

    /// Compile the tag's markup; the parser rejects leftovers in strict mode.
    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Markup(markup.take_rest().to_string()))
    }

    /// Compile the markup of one of the block's clauses.
    fn parse_clause(&self, _name: &str, _markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Empty)
    }

    /// Resolve the tag to a nested document at parse time, if possible.
    fn link(&self, _args: &TagArgs, _registry: &Registry) -> Option<Arc<Document>> {
        None
    }

    /// Render the tag, appending to `out`.
    fn render(
        &self,
        call: &TagCall,
        ctx: &mut Context<'_>,
        out: &mut String,
    ) -> Result<(), RenderError>;
}

/// Evaluated arguments of one filter invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    positional: Vec<Value>,
    keywords: IndexMap<String, Value>,
}

impl FilterArgs {
    pub fn new(positional: Vec<Value>, keywords: IndexMap<String, Value>) -> Self {
        Self {
            positional,
            keywords,
        }
    }

    /// Positional argument `index`, if supplied.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument `name`, if supplied.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    /// Positional argument `index`, or an error naming the filter.
    pub fn require(&self, index: usize, filter: &str) -> anyhow::Result<&Value> {
        self.get(index)
            .ok_or_else(|| anyhow::anyhow!("'{filter}' requires at least {} argument(s)", index + 1))
    }
}

/// A filter capability.
///
/// Implemented for every `Fn(&Value, &FilterArgs, &Context) -> anyhow::Result<Value>`.
pub trait Filter: Send + Sync {
    fn invoke(
        &self,
        input: &Value,
        args: &FilterArgs,
        ctx: &Context<'_>,
    ) -> anyhow::Result<Value>;
}

impl<F> Filter for F
where
    F: Fn(&Value, &FilterArgs, &Context<'_>) -> anyhow::Result<Value> + Send + Sync,
{
    fn invoke(
        &self,
        input: &Value,
        args: &FilterArgs,
        ctx: &Context<'_>,
    ) -> anyhow::Result<Value> {
        self(input, args, ctx)
    }
}

/// Name-to-capability tables.
#[derive(Clone, Default)]
pub struct Registry {
    tags: HashMap<String, Arc<dyn Tag>>,
    filters: HashMap<String, Arc<dyn Filter>>,
    partials: HashMap<String, Arc<Document>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the standard tags and filters.
    pub fn standard() -> Self {
        let registry = tags::register(Self::new());
        filters::register(registry)
    }

    /// Add or replace a tag.
    pub fn with_tag(mut self, name: impl Into<String>, tag: impl Tag + 'static) -> Self {
        self.tags.insert(name.into(), Arc::new(tag));
        self
    }

    /// Add or replace a filter.
    pub fn with_filter(mut self, name: impl Into<String>, filter: impl Filter + 'static) -> Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    /// Compile `source` against the current registry and add it as a partial.
    ///
    /// Partials registered earlier are linked into this one statically;
    /// later or self references resolve at render time.
    pub fn with_partial(
        mut self,
        name: impl Into<String>,
        source: &str,
        settings: &ParseSettings,
    ) -> Result<Self, ParseError> {
        let name = name.into();
        let mut document = crate::parser::parse_document(source, settings, &self)?;
        document.name = Some(name.clone());
        tracing::debug!(partial = %name, nodes = document.nodes.len(), "Registered partial");
        self.partials.insert(name, Arc::new(document));
        Ok(self)
    }

    pub fn tag(&self, name: &str) -> Option<&dyn Tag> {
        self.tags.get(name).map(|tag| tag.as_ref())
    }

    pub fn filter(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(|filter| filter.as_ref())
    }

    pub fn partial(&self, name: &str) -> Option<&Arc<Document>> {
        self.partials.get(name)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Whether `name` is a clause of any registered block tag.
    pub fn is_clause(&self, name: &str) -> bool {
        self.tags.values().any(|tag| match tag.shape() {
            TagShape::Block {
                clauses,
            } => clauses.contains(&name),
            _ => false,
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tag_names().collect();
        let mut filters: Vec<_> = self.filter_names().collect();
        let mut partials: Vec<_> = self.partials.keys().collect();
        tags.sort_unstable();
        filters.sort_unstable();
        partials.sort_unstable();
        f.debug_struct("Registry")
            .field("tags", &tags)
            .field("filters", &filters)
            .field("partials", &partials)
            .finish()
    }
}
