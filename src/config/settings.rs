//! Parse-time settings: flavor, global whitespace stripping and size limits.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_TEMPLATE_SIZE_BYTES};

/// Grammar and evaluation compatibility mode, selected at parse time.
///
/// # Differences
///
/// | Situation                          | `Strict`          | `Liquid`                  |
/// |------------------------------------|-------------------|---------------------------|
/// | Undefined variable                 | render error      | renders as empty          |
/// | `<>` operator                      | syntax error      | same as `!=`              |
/// | Empty output `{{ }}`               | syntax error      | renders nothing           |
/// | Trailing tokens in markup          | syntax error      | ignored                   |
/// | `"3" \| plus: 1`                   | filter error      | `4`                       |
/// | `1 < "a"`                          | type mismatch     | `false`                   |
/// | `assign` inside a block            | current scope     | render-wide (root) scope  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    /// Strict grammar; anomalies fail the render.
    Strict,
    /// Compatible with the reference Liquid implementation.
    #[default]
    Liquid,
}

impl Flavor {
    /// Whether this flavor fails on undefined variables and type mismatches.
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Settings that control how source text is compiled.
///
/// # Examples
///
/// ```rust
/// use liqrs::{Flavor, ParseSettings};
///
/// let settings = ParseSettings::builder()
///     .flavor(Flavor::Strict)
///     .strip_space_around_tags(true)
///     .build();
///
/// assert!(settings.strip_space_around_tags);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseSettings {
    /// Grammar flavor
    pub flavor: Flavor,
    /// Collapse the line of every `{% %}` tag even without trim markers
    pub strip_space_around_tags: bool,
    /// Maximum accepted source size in bytes (`None` for no limit)
    pub max_size_bytes: Option<usize>,
    /// Maximum block nesting depth accepted by the parser
    pub max_depth: usize,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            flavor: Flavor::default(),
            strip_space_around_tags: false,
            max_size_bytes: Some(DEFAULT_MAX_TEMPLATE_SIZE_BYTES),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseSettings {
    /// Start building settings from the defaults.
    pub fn builder() -> ParseSettingsBuilder {
        ParseSettingsBuilder::default()
    }

    /// The default settings with another flavor.
    pub fn with_flavor(flavor: Flavor) -> Self {
        Self {
            flavor,
            ..Self::default()
        }
    }
}

/// Builder for [`ParseSettings`].
#[derive(Debug, Clone, Default)]
pub struct ParseSettingsBuilder {
    settings: ParseSettings,
}

impl ParseSettingsBuilder {
    /// Select the grammar flavor.
    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.settings.flavor = flavor;
        self
    }

    /// Enable or disable global whitespace stripping around tags.
    pub fn strip_space_around_tags(mut self, strip: bool) -> Self {
        self.settings.strip_space_around_tags = strip;
        self
    }

    /// Limit the source size; `None` disables the check.
    pub fn max_size_bytes(mut self, limit: impl Into<Option<usize>>) -> Self {
        self.settings.max_size_bytes = limit.into();
        self
    }

    /// Limit block nesting in the source.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.settings.max_depth = depth;
        self
    }

    /// Finish building.
    pub fn build(self) -> ParseSettings {
        self.settings
    }
}
