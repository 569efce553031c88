//! Source text to node tree.
//!
//! Parsing runs in four stages:
//!
//! 1. size check against [`ParseSettings::max_size_bytes`]
//! 2. [`lexer`] splits the source into text runs and directives
//! 3. [`whitespace`] applies trim markers and global stripping to the text
//!    runs
//! 4. [`tree`] builds the node tree, compiling directive markup with
//!    [`Markup`] and consulting the [`Registry`] for tag shapes
//!
//! Any failure aborts the whole parse; no partial document is returned.

pub(crate) mod lexer;
pub mod markup;
pub(crate) mod tree;
pub(crate) mod whitespace;

pub use markup::Markup;

use crate::ast::Document;
use crate::config::ParseSettings;
use crate::core::ParseError;
use crate::registry::{Registry, TagShape};

/// Compile `source` into a [`Document`].
///
/// # Errors
///
/// Returns [`ParseError::SizeExceeded`] before looking at the source when it
/// is too large, and the first lexical, syntactic or nesting error otherwise.
pub fn parse_document(
    source: &str,
    settings: &ParseSettings,
    registry: &Registry,
) -> Result<Document, ParseError> {
    if let Some(limit) = settings.max_size_bytes
        && source.len() > limit
    {
        return Err(ParseError::SizeExceeded {
            size: source.len(),
            limit,
        });
    }

    let is_raw = |name: &str| registry.tag(name).is_some_and(|tag| tag.shape() == TagShape::Raw);
    let tokens = lexer::tokenize(source, is_raw)?;
    let tokens = whitespace::apply(tokens, settings.strip_space_around_tags);
    let nodes = tree::build(source, tokens, registry, settings)?;

    tracing::debug!(
        bytes = source.len(),
        nodes = nodes.len(),
        flavor = ?settings.flavor,
        "Parsed template"
    );

    Ok(Document {
        name: None,
        nodes,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    #[test]
    fn test_size_limit_is_checked_first() {
        let settings = ParseSettings::builder().max_size_bytes(4).build();
        let err = parse_document("{{ unterminated", &settings, &Registry::standard()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::SizeExceeded {
                size: 15,
                limit: 4
            }
        ));
    }

    #[test]
    fn test_size_limit_disabled() {
        let settings = ParseSettings::builder().max_size_bytes(None).build();
        let source = "x".repeat(64);
        assert!(parse_document(&source, &settings, &Registry::new()).is_ok());
    }

    #[test]
    fn test_plain_text_is_single_literal() {
        let document = parse_document("a\r\nb\n", &ParseSettings::default(), &Registry::new()).unwrap();
        assert_eq!(document.nodes, vec![Node::Literal("a\r\nb\n".into())]);
    }

    #[test]
    fn test_global_strip_applies_before_tree_building() {
        let settings = ParseSettings::builder().strip_space_around_tags(true).build();
        let document =
            parse_document("a\n  {% assign x = 1 %}  \nb", &settings, &Registry::standard()).unwrap();
        assert_eq!(document.nodes.len(), 3);
        assert_eq!(document.nodes[0], Node::Literal("a\n".into()));
        assert_eq!(document.nodes[2], Node::Literal("b".into()));
    }
}
