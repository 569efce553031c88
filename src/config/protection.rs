//! Resource ceilings that guard parsing and rendering.
//!
//! [`ProtectionSettings`] is immutable, `Copy`, and shared read-only by every
//! render. Each render seeds its own [`RenderGuard`](crate::guard::RenderGuard)
//! from it, so concurrent renders never share counters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_MAX_RENDER_TIME_MS, DEFAULT_MAX_TEMPLATE_SIZE_BYTES,
};

/// Configured resource ceilings.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use liqrs::ProtectionSettings;
///
/// let settings = ProtectionSettings::builder()
///     .max_iterations(1_000)
///     .max_render_time(Duration::from_millis(250))
///     .max_depth(16)
///     .build();
///
/// assert_eq!(settings.max_iterations, 1_000);
/// assert_eq!(settings.max_render_time(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionSettings {
    /// Whether any limit is enforced at all
    pub enabled: bool,
    /// Maximum template source size in bytes
    pub max_template_size_bytes: usize,
    /// Maximum iterations of a single loop construct
    pub max_iterations: usize,
    /// Maximum wall-clock time of one render, in milliseconds
    pub max_render_time_ms: u64,
    /// Maximum nesting depth of blocks, loops and partials during a render
    pub max_depth: usize,
    /// Maximum size of the rendered output in bytes
    pub max_output_bytes: usize,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_template_size_bytes: DEFAULT_MAX_TEMPLATE_SIZE_BYTES,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_render_time_ms: DEFAULT_MAX_RENDER_TIME_MS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ProtectionSettings {
    /// Start building settings from the defaults.
    pub fn builder() -> ProtectionSettingsBuilder {
        ProtectionSettingsBuilder::default()
    }

    /// Settings with every check switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// The render-time budget as a [`Duration`].
    pub fn max_render_time(&self) -> Duration {
        Duration::from_millis(self.max_render_time_ms)
    }

    /// The source size limit to apply at parse time, if protection is on.
    pub fn template_size_limit(&self) -> Option<usize> {
        self.enabled.then_some(self.max_template_size_bytes)
    }
}

/// Builder for [`ProtectionSettings`].
#[derive(Debug, Clone, Default)]
pub struct ProtectionSettingsBuilder {
    settings: ProtectionSettings,
}

impl ProtectionSettingsBuilder {
    /// Turn protection on or off as a whole.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.settings.enabled = enabled;
        self
    }

    /// Maximum template source size in bytes.
    pub fn max_template_size_bytes(mut self, bytes: usize) -> Self {
        self.settings.max_template_size_bytes = bytes;
        self
    }

    /// Maximum iterations of any single loop construct.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.settings.max_iterations = iterations;
        self
    }

    /// Wall-clock budget of one render.
    pub fn max_render_time(mut self, budget: Duration) -> Self {
        self.settings.max_render_time_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Maximum nesting depth during a render.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.settings.max_depth = depth;
        self
    }

    /// Maximum rendered output size in bytes.
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.settings.max_output_bytes = bytes;
        self
    }

    /// Finish building.
    pub fn build(self) -> ProtectionSettings {
        self.settings
    }
}
