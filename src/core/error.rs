//! Error types for parsing and rendering templates.
//!
//! The error system mirrors the two phases of the engine:
//! - [`ParseError`] - everything that can go wrong while compiling source text.
//!   A parse error is always fatal to that parse call and no partial template
//!   is ever returned.
//! - [`RenderError`] - failures while evaluating a compiled template against
//!   data: undefined variables (strict flavor only), unknown capabilities,
//!   filter failures and tripped protection limits.
//!
//! [`Error`] unifies both (plus data conversion failures) for callers that go
//! from source text to output in one step, and offers
//! [`Error::format_with_context`] for user-facing reports.
//!
//! # Examples
//!
//! ```rust
//! use liqrs::core::{LimitKind, RenderError};
//! use liqrs::{ProtectionSettings, Template, Value};
//!
//! let template = Template::parse("{% for i in (1..5) %}{{ i }}{% endfor %}").unwrap();
//! let settings = ProtectionSettings::builder().max_iterations(3).build();
//!
//! match template.render_with(&Value::Nil, &settings) {
//!     Err(RenderError::LimitExceeded { limit, .. }) => assert_eq!(limit, LimitKind::Iterations),
//!     other => panic!("expected a limit error, got {other:?}"),
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// Position of an error inside the template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
    /// The full source line containing the error, without its terminator
    pub snippet: String,
}

impl Location {
    /// Compute the location of a byte offset in `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &source[..offset];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[line_start..].find('\n').map_or(source.len(), |i| line_start + i);

        Self {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
            snippet: source[line_start..line_end].trim_end_matches('\r').to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors raised while compiling template source.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The source is larger than the configured maximum.
    #[error("template source is {size} bytes, exceeding the limit of {limit} bytes")]
    SizeExceeded {
        /// Size of the rejected source in bytes
        size: usize,
        /// Configured maximum in bytes
        limit: usize,
    },

    /// Malformed directive or expression.
    #[error("syntax error at {location}: {message}")]
    Syntax {
        /// What went wrong
        message: String,
        /// Where it went wrong
        location: Location,
    },

    /// A `{% name %}` directive whose name is not registered.
    #[error("unknown tag '{name}' at {location}")]
    UnknownTag {
        /// The unregistered tag name
        name: String,
        /// Closest registered tag name, if any is similar enough
        suggestion: Option<String>,
        /// Where the tag appears
        location: Location,
    },

    /// A delimiter or block that is never closed.
    #[error("'{opener}' opened at {location} is never closed; expected '{expected}'")]
    Unterminated {
        /// The delimiter or tag that was opened (`{{`, `if`, ...)
        opener: String,
        /// The closer that was expected (`}}`, `endif`, ...)
        expected: String,
        /// Where the unclosed construct starts
        location: Location,
    },

    /// A closing or clause tag that does not belong where it appears.
    #[error("unexpected '{found}' at {location}; expected {expected}")]
    Mismatched {
        /// The tag that was found
        found: String,
        /// Description of what would have been valid
        expected: String,
        /// Where the offending tag appears
        location: Location,
    },

    /// Blocks, ranges or brackets nested deeper than the parser allows.
    #[error("nesting deeper than {limit} levels at {location}")]
    TooDeep {
        /// Configured nesting limit
        limit: usize,
        /// The block that crossed the limit
        location: Location,
    },
}

impl ParseError {
    /// Source location of the error, when it has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::SizeExceeded {
                ..
            } => None,
            Self::Syntax {
                location,
                ..
            }
            | Self::UnknownTag {
                location,
                ..
            }
            | Self::Unterminated {
                location,
                ..
            }
            | Self::Mismatched {
                location,
                ..
            }
            | Self::TooDeep {
                location,
                ..
            } => Some(location),
        }
    }
}

/// The protection limit that stopped a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Iterations of a single loop construct
    Iterations,
    /// Nesting depth of blocks, loops and partials
    Depth,
    /// Wall-clock time of the render, in milliseconds
    RenderTime,
    /// Size of the rendered output, in bytes
    OutputSize,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Iterations => "loop iteration",
            Self::Depth => "nesting depth",
            Self::RenderTime => "render time (ms)",
            Self::OutputSize => "output size (bytes)",
        };
        f.write_str(name)
    }
}

/// Errors raised while rendering a compiled template.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Lookup of a name that is bound nowhere (strict flavor).
    #[error("undefined variable '{name}'")]
    UndefinedVariable {
        /// The full variable path that failed to resolve
        name: String,
        /// Closest bound name, if any is similar enough
        suggestion: Option<String>,
        /// Names bound at the time of the lookup
        available: Vec<String>,
    },

    /// A tag node whose capability is missing from the registry.
    #[error("unknown tag '{name}'")]
    UnknownTag {
        /// The tag name
        name: String,
    },

    /// A filter that is not registered.
    #[error("unknown filter '{name}'")]
    UnknownFilter {
        /// The filter name
        name: String,
        /// Closest registered filter name, if any is similar enough
        suggestion: Option<String>,
    },

    /// An `include` naming a partial that is not registered.
    #[error("unknown partial '{name}'")]
    UnknownPartial {
        /// The partial name
        name: String,
    },

    /// A protection limit tripped; the render is aborted.
    #[error("{limit} limit exceeded: observed {observed}, maximum {max}")]
    LimitExceeded {
        /// Which limit tripped
        limit: LimitKind,
        /// The value that crossed the limit
        observed: u64,
        /// The configured maximum
        max: u64,
    },

    /// A filter capability returned an error.
    #[error("filter '{name}' failed: {source}")]
    Filter {
        /// The filter name
        name: String,
        /// The error reported by the filter
        #[source]
        source: anyhow::Error,
    },

    /// Values that cannot be compared or iterated (strict flavor).
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// Render data whose root is not a mapping.
    #[error("invalid render data: {message}")]
    InvalidData {
        /// Description of the problem
        message: String,
    },
}

impl RenderError {
    /// Whether this error was caused by a protection limit.
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::LimitExceeded { .. })
    }
}

/// Any error produced between source text and rendered output.
#[derive(Error, Debug)]
pub enum Error {
    /// Compiling the template failed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Rendering the template failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Engine configuration could not be loaded
    #[error("invalid engine configuration: {0:#}")]
    Config(#[source] anyhow::Error),

    /// Host data could not be converted into template values
    #[error("failed to convert render data: {0}")]
    Data(#[from] serde_json::Error),
}

impl Error {
    /// Generate a user-facing report with location, snippet and suggestions.
    pub fn format_with_context(&self) -> String {
        match self {
            Self::Parse(error) => super::error_formatting::format_parse_error(error),
            Self::Render(error) => super::error_formatting::format_render_error(error),
            Self::Config(error) => format!("ERROR: Invalid Configuration\n\nError: {error:#}\n"),
            Self::Data(error) => format!("ERROR: Invalid Render Data\n\nError: {error}\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "first\nsecond {{ oops\nthird";
        let offset = source.find("{{").unwrap();
        let location = Location::from_offset(source, offset);

        assert_eq!(location.line, 2);
        assert_eq!(location.column, 8);
        assert_eq!(location.snippet, "second {{ oops");
    }

    #[test]
    fn test_location_strips_carriage_return() {
        let source = "a\r\nb {% x";
        let location = Location::from_offset(source, source.len());
        assert_eq!(location.line, 2);
        assert_eq!(location.snippet, "b {% x");

        let location = Location::from_offset(source, 0);
        assert_eq!(location.snippet, "a");
    }

    #[test]
    fn test_location_clamps_to_char_boundary() {
        let source = "héllo";
        let location = Location::from_offset(source, 2);
        assert_eq!(location.line, 1);
        assert_eq!(location.column, 2);
    }

    #[test]
    fn test_limit_error_display() {
        let error = RenderError::LimitExceeded {
            limit: LimitKind::Iterations,
            observed: 11,
            max: 10,
        };
        assert!(error.is_limit());
        assert_eq!(error.to_string(), "loop iteration limit exceeded: observed 11, maximum 10");
    }
}
