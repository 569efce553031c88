//! Splits template source into text runs and directive tokens.
//!
//! The lexer only finds delimiters and trim markers; markup inside a
//! directive is compiled later by [`Markup`](super::Markup). Text tokens are
//! subslices of the source so line endings survive byte-for-byte.

use crate::ast::Span;
use crate::core::{Location, ParseError};

/// Trim markers on the two sides of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trim {
    /// `{{-` or `{%-`
    pub left: bool,
    /// `-}}` or `-%}`
    pub right: bool,
}

/// A lexical unit of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'s> {
    Text(&'s str),
    Output {
        markup: &'s str,
        trim: Trim,
        span: Span,
    },
    Tag {
        name: &'s str,
        /// Markup after the tag name
        markup: &'s str,
        trim: Trim,
        span: Span,
        /// Verbatim body of raw-shaped tags, up to their closer
        raw_body: Option<&'s str>,
    },
}

impl Token<'_> {
    /// Trim markers of a directive; text has none.
    pub fn trim(&self) -> Trim {
        match self {
            Self::Text(_) => Trim::default(),
            Self::Output {
                trim,
                ..
            }
            | Self::Tag {
                trim,
                ..
            } => *trim,
        }
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag { .. })
    }
}

/// Tokenize `source`.
///
/// `is_raw` reports whether a tag name captures its body verbatim.
pub fn tokenize<'s>(
    source: &'s str,
    is_raw: impl Fn(&str) -> bool,
) -> Result<Vec<Token<'s>>, ParseError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(found) = find_opener(source, pos) {
        if found > pos {
            tokens.push(Token::Text(&source[pos..found]));
        }

        let is_output = source[found..].starts_with("{{");
        let (open, close) = if is_output { ("{{", "}}") } else { ("{%", "%}") };

        let mut inner_start = found + 2;
        let left = source[inner_start..].starts_with('-');
        if left {
            inner_start += 1;
        }

        let Some(close_rel) = source[inner_start..].find(close) else {
            return Err(ParseError::Unterminated {
                opener: open.to_string(),
                expected: close.to_string(),
                location: Location::from_offset(source, found),
            });
        };
        let close_at = inner_start + close_rel;
        let right = close_at > inner_start && source.as_bytes()[close_at - 1] == b'-';
        let inner_end = if right { close_at - 1 } else { close_at };
        let end = close_at + 2;
        let inner = &source[inner_start..inner_end];
        let trim = Trim {
            left,
            right,
        };

        if is_output {
            tokens.push(Token::Output {
                markup: inner,
                trim,
                span: Span::new(found, end),
            });
            pos = end;
            continue;
        }

        let body = inner.trim_start();
        let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
        let name = &body[..name_len];
        if name.is_empty() {
            return Err(ParseError::Syntax {
                message: "tag name expected after '{%'".to_string(),
                location: Location::from_offset(source, found),
            });
        }
        let markup = &body[name_len..];

        if is_raw(name) {
            let Some(closer) = find_raw_closer(source, end, name) else {
                return Err(ParseError::Unterminated {
                    opener: name.to_string(),
                    expected: format!("end{name}"),
                    location: Location::from_offset(source, found),
                });
            };
            tokens.push(Token::Tag {
                name,
                markup,
                trim: Trim {
                    left,
                    right: closer.right_trim,
                },
                span: Span::new(found, closer.end),
                raw_body: Some(&source[end..closer.start]),
            });
            pos = closer.end;
        } else {
            tokens.push(Token::Tag {
                name,
                markup,
                trim,
                span: Span::new(found, end),
                raw_body: None,
            });
            pos = end;
        }
    }

    if pos < source.len() {
        tokens.push(Token::Text(&source[pos..]));
    }

    tracing::trace!(count = tokens.len(), "Tokenized template source");
    Ok(tokens)
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn find_opener(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut index = source[from..].find('{')? + from;
    while index + 1 < bytes.len() {
        if matches!(bytes[index + 1], b'{' | b'%') {
            return Some(index);
        }
        index = source[index + 1..].find('{')? + index + 1;
    }
    None
}

struct RawCloser {
    start: usize,
    end: usize,
    right_trim: bool,
}

/// Locate `{%-? end<name> -?%}` at or after `from`.
fn find_raw_closer(source: &str, from: usize, name: &str) -> Option<RawCloser> {
    let mut search = from;
    while let Some(rel) = source[search..].find("{%") {
        let start = search + rel;
        let mut cursor = start + 2;
        if source[cursor..].starts_with('-') {
            cursor += 1;
        }
        let rest = source[cursor..].trim_start();
        cursor = source.len() - rest.len();

        if let Some(after_end) = rest.strip_prefix("end")
            && let Some(after_name) = after_end.strip_prefix(name)
            && !after_name.starts_with(is_name_char)
        {
            let tail = after_name.trim_start();
            let (right_trim, tail) = match tail.strip_prefix('-') {
                Some(tail) => (true, tail),
                None => (false, tail),
            };
            if tail.starts_with("%}") {
                let end = source.len() - tail.len() + 2;
                return Some(RawCloser {
                    start,
                    end,
                    right_trim,
                });
            }
        }
        search = cursor.max(start + 2);
    }
    None
}
