//! Core error types and diagnostics.
//!
//! - [`error`] - [`ParseError`], [`RenderError`] and the crate-level [`Error`]
//! - [`error_formatting`] - multi-line user-facing reports
//! - [`suggestions`] - "did you mean" lookups over known names

pub mod error;
pub mod error_formatting;
pub mod suggestions;

pub use error::{Error, LimitKind, Location, ParseError, RenderError};
pub use suggestions::{best_match, find_similar};
