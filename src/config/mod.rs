//! Engine configuration.
//!
//! Two independent groups of settings control the engine:
//!
//! 1. [`ParseSettings`] - flavor, global whitespace stripping, source size and
//!    nesting limits applied while compiling.
//! 2. [`ProtectionSettings`] - ceilings enforced while rendering (iterations,
//!    depth, wall-clock time, output size).
//!
//! [`EngineConfig`] bundles both and can be loaded from TOML:
//!
//! ```toml
//! [parse]
//! flavor = "strict"              # or "liquid" (default)
//! strip_space_around_tags = true
//! max_size_bytes = 1048576
//!
//! [protection]
//! enabled = true
//! max_iterations = 10000
//! max_render_time_ms = 500
//! max_depth = 32
//! max_output_bytes = 4194304
//! ```
//!
//! Every field is optional; missing fields fall back to the defaults in
//! [`crate::constants`].

mod parser;
mod protection;
mod settings;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use parser::parse_config;
pub use protection::{ProtectionSettings, ProtectionSettingsBuilder};
pub use settings::{Flavor, ParseSettings, ParseSettingsBuilder};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settings applied while compiling templates
    pub parse: ParseSettings,
    /// Limits applied while rendering templates
    pub protection: ProtectionSettings,
}

impl EngineConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use liqrs::config::{EngineConfig, Flavor};
    ///
    /// let config = EngineConfig::from_toml_str("[parse]\nflavor = \"strict\"\n").unwrap();
    /// assert_eq!(config.parse.flavor, Flavor::Strict);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse engine configuration")
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize engine configuration")
    }

    /// The source size limit implied by both setting groups.
    ///
    /// The stricter of `parse.max_size_bytes` and, when protection is
    /// enabled, `protection.max_template_size_bytes`.
    pub fn effective_size_limit(&self) -> Option<usize> {
        match (self.parse.max_size_bytes, self.protection.template_size_limit()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
