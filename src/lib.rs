//! liqrs - a Liquid-compatible template engine
//!
//! Templates are compiled once into an immutable node tree and rendered any
//! number of times, from any number of threads, against data supplied by the
//! host. Every capability a template can call (tags, filters, partials) lives
//! in an explicit [`Registry`]; nothing is looked up through global state.
//!
//! # Architecture Overview
//!
//! Source text flows through four stages:
//! - the [`parser`] splits it into text runs and `{{ }}` / `{% %}` directives,
//!   applies whitespace control and builds the [`ast`]
//! - a [`Template`] owns the finished tree and the registry it was compiled
//!   against
//! - the [`render`] walk evaluates the tree against a per-render
//!   [`Context`]
//! - a [`guard`] enforces iteration, depth, time and output limits on every
//!   render
//!
//! ## Flavors
//!
//! [`Flavor::Liquid`] (the default) follows the reference Liquid library:
//! undefined variables render as empty and odd input is tolerated.
//! [`Flavor::Strict`] turns those cases into errors.
//!
//! # Core Modules
//!
//! - [`ast`] - node tree and compiled expressions
//! - [`parser`] - lexer, whitespace control, expression parser, tree builder
//! - [`context`] - template values and per-render evaluation state
//! - [`registry`] - tag and filter capabilities, standard library, partials
//! - [`render`] - node walk and expression evaluation
//! - [`guard`] - per-render protection limits
//! - [`template`] - [`Template`] and [`Engine`] entry points
//! - [`config`] - parse and protection settings, TOML loading
//! - [`core`] - error types and diagnostics
//!
//! # Example
//!
//! ```rust
//! use liqrs::{Template, Value};
//! use serde_json::json;
//!
//! let template = Template::parse(
//!     "{% for item in items %}{{ item.name | upcase }}{% unless forloop.last %}, {% endunless %}{% endfor %}",
//! )
//! .unwrap();
//!
//! let data = Value::from(json!({"items": [{"name": "tea"}, {"name": "milk"}]}));
//! assert_eq!(template.render(&data).unwrap(), "TEA, MILK");
//! ```
//!
//! ## Whitespace control
//!
//! ```rust
//! use liqrs::{ParseSettings, Value, parse};
//!
//! let settings = ParseSettings::builder().strip_space_around_tags(true).build();
//! let template = parse("a\n  {% if true %}\nb\n  {% endif %}\nc", &settings).unwrap();
//! assert_eq!(template.render(&Value::Nil).unwrap(), "a\nb\nc");
//! ```

// Compilation
pub mod ast;
pub mod parser;

// Evaluation
pub mod context;
pub mod guard;
pub mod registry;
pub mod render;

// Entry points and configuration
pub mod config;
pub mod constants;
pub mod core;
pub mod template;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{EngineConfig, Flavor, ParseSettings, ProtectionSettings};
pub use context::{Context, Object, Value};
pub use core::{Error, ParseError, RenderError};
pub use registry::Registry;
pub use template::{Engine, Template, parse};
