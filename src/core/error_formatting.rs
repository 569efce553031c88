//! User-facing formatting for template errors.
//!
//! Converts [`ParseError`] and [`RenderError`] values into multi-line reports
//! that show where the problem is and, when possible, what the author most
//! likely meant.

use std::fmt::Write;

use super::error::{Location, ParseError, RenderError};
use crate::constants::MAX_LISTED_VARIABLES;

/// Format a parse error with its source snippet and a suggestion.
pub fn format_parse_error(error: &ParseError) -> String {
    let mut msg = String::new();

    msg.push_str("ERROR: Template Syntax Error\n\n");
    let _ = writeln!(msg, "Error: {error}");

    if let Some(location) = error.location() {
        msg.push('\n');
        msg.push_str(&format_snippet(location));
    }

    match error {
        ParseError::SizeExceeded {
            ..
        } => {
            msg.push_str("\nSUGGESTION: Split the template or raise `max_size_bytes`.\n");
        }
        ParseError::UnknownTag {
            suggestion: Some(suggestion),
            ..
        } => {
            let _ = writeln!(msg, "\nDid you mean '{suggestion}'?");
        }
        ParseError::Unterminated {
            expected,
            ..
        } => {
            let _ = writeln!(msg, "\nSUGGESTION: Add '{expected}' to close this construct.");
        }
        _ => {}
    }

    msg
}

/// Format a render error, naming the failed lookup or limit.
pub fn format_render_error(error: &RenderError) -> String {
    let mut msg = String::new();

    match error {
        RenderError::UndefinedVariable {
            name,
            suggestion,
            available,
        } => {
            msg.push_str("ERROR: Template Variable Not Found\n\n");
            let _ = writeln!(msg, "Variable: {name}");

            if let Some(suggestion) = suggestion {
                let _ = writeln!(msg, "\nDid you mean '{suggestion}'?");
            }

            if !available.is_empty() {
                msg.push_str("\nAvailable variables in this context:\n");
                for var in available.iter().take(MAX_LISTED_VARIABLES) {
                    let _ = writeln!(msg, "  {var}");
                }
                if available.len() > MAX_LISTED_VARIABLES {
                    let _ = writeln!(
                        msg,
                        "  ... and {} more",
                        available.len() - MAX_LISTED_VARIABLES
                    );
                }
            }
        }
        RenderError::UnknownFilter {
            name,
            suggestion,
        } => {
            msg.push_str("ERROR: Unknown Filter\n\n");
            let _ = writeln!(msg, "Filter: {name}");
            if let Some(suggestion) = suggestion {
                let _ = writeln!(msg, "\nDid you mean '{suggestion}'?");
            }
        }
        RenderError::LimitExceeded {
            limit,
            observed,
            max,
        } => {
            msg.push_str("ERROR: Resource Limit Exceeded\n\n");
            let _ = writeln!(msg, "Limit: {limit}");
            let _ = writeln!(msg, "Observed: {observed}");
            let _ = writeln!(msg, "Maximum: {max}");
            msg.push_str("\nThe render was aborted and produced no output.\n");
        }
        other => {
            msg.push_str("ERROR: Template Rendering Failed\n\n");
            let _ = writeln!(msg, "Error: {other}");

            let mut source = std::error::Error::source(other);
            while let Some(cause) = source {
                let _ = writeln!(msg, "  caused by: {cause}");
                source = cause.source();
            }
        }
    }

    msg
}

/// Render a source line with a caret under the error column.
fn format_snippet(location: &Location) -> String {
    let gutter = location.line.to_string();
    let mut out = String::new();
    let _ = writeln!(out, "{gutter} | {}", location.snippet);
    let _ = writeln!(
        out,
        "{} | {}^",
        " ".repeat(gutter.len()),
        " ".repeat(location.column.saturating_sub(1))
    );
    out
}
