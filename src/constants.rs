//! Default limits and other numeric constants used across the engine.
//!
//! Protection defaults are deliberately generous: they exist to stop runaway
//! or adversarial templates, not to constrain ordinary ones. Hosts that render
//! untrusted input usually tighten them through
//! [`ProtectionSettings::builder`](crate::config::ProtectionSettings::builder).

use std::time::Duration;

/// Default maximum template source size (10 MiB).
pub const DEFAULT_MAX_TEMPLATE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Default maximum number of iterations a single loop construct may perform.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// Default wall-clock budget for one render call (10 seconds).
pub const DEFAULT_MAX_RENDER_TIME_MS: u64 = 10_000;

/// Default maximum nesting depth for blocks, loops and included partials.
///
/// Applies both to the parser (block nesting in the source) and to the
/// renderer (scope frames and partial recursion).
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default maximum size of the rendered output (64 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

/// Maximum allowed Levenshtein distance as a percentage of the target length
/// when suggesting tag, filter or variable names.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Number of variable names listed in "undefined variable" reports.
pub const MAX_LISTED_VARIABLES: usize = 10;

/// Convenience accessor for [`DEFAULT_MAX_RENDER_TIME_MS`].
pub fn default_render_time() -> Duration {
    Duration::from_millis(DEFAULT_MAX_RENDER_TIME_MS)
}
