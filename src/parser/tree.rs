//! Recursive-descent tree building over the normalized token stream.

use crate::ast::{Clause, Node, Output, Span, TagCall};
use crate::config::ParseSettings;
use crate::core::{Location, ParseError, best_match};
use crate::registry::{Registry, TagShape};

use super::Markup;
use super::lexer::Token;

/// Build the node list of a document.
pub fn build<'s>(
    source: &'s str,
    tokens: Vec<Token<'s>>,
    registry: &Registry,
    settings: &ParseSettings,
) -> Result<Vec<Node>, ParseError> {
    let mut builder = TreeBuilder {
        source,
        tokens: tokens.into_iter(),
        registry,
        settings,
        depth: 0,
    };
    let (nodes, _) = builder.parse_until(None)?;
    Ok(nodes)
}

/// Why a body stopped.
enum Stop<'s> {
    Eof,
    End,
    Clause {
        name: &'s str,
        markup: &'s str,
        span: Span,
    },
}

/// The block whose body is being parsed.
struct OpenBlock<'s> {
    name: &'s str,
    clauses: &'static [&'static str],
    span: Span,
}

struct TreeBuilder<'s, 'r> {
    source: &'s str,
    tokens: std::vec::IntoIter<Token<'s>>,
    registry: &'r Registry,
    settings: &'r ParseSettings,
    depth: usize,
}

impl<'s> TreeBuilder<'s, '_> {
    fn parse_until(&mut self, open: Option<&OpenBlock<'s>>) -> Result<(Vec<Node>, Stop<'s>), ParseError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Literal(text.to_string())),
                Token::Output {
                    markup,
                    span,
                    ..
                } => {
                    let mut markup = self.markup(markup);
                    let expr = markup.filtered()?;
                    markup.expect_end()?;
                    nodes.push(Node::Output(Output {
                        expr,
                        span,
                    }));
                }
                Token::Tag {
                    name,
                    markup,
                    span,
                    raw_body,
                    ..
                } => {
                    if let Some(open) = open {
                        if name.strip_prefix("end") == Some(open.name) {
                            return Ok((nodes, Stop::End));
                        }
                        if open.clauses.contains(&name) {
                            return Ok((
                                nodes,
                                Stop::Clause {
                                    name,
                                    markup,
                                    span,
                                },
                            ));
                        }
                    }
                    nodes.push(self.tag(name, markup, span, raw_body, open)?);
                }
            }
        }

        match open {
            Some(open) => Err(ParseError::Unterminated {
                opener: open.name.to_string(),
                expected: format!("end{}", open.name),
                location: self.location(open.span),
            }),
            None => Ok((nodes, Stop::Eof)),
        }
    }

    fn tag(
        &mut self,
        name: &'s str,
        markup: &'s str,
        span: Span,
        raw_body: Option<&'s str>,
        open: Option<&OpenBlock<'s>>,
    ) -> Result<Node, ParseError> {
        let Some(tag) = self.registry.tag(name) else {
            return Err(self.unknown_tag(name, span, open));
        };

        let mut args_markup = self.markup(markup);
        let args = tag.parse(&mut args_markup)?;
        args_markup.expect_end()?;

        let mut call = TagCall {
            name: name.to_string(),
            args,
            body: Vec::new(),
            clauses: Vec::new(),
            span,
        };

        match tag.shape() {
            TagShape::Simple => {
                if let Some(document) = tag.link(&call.args, self.registry) {
                    tracing::trace!(tag = name, "Linked partial at parse time");
                    return Ok(Node::Document(document));
                }
                Ok(Node::Tag(call))
            }
            TagShape::Raw => {
                if let Some(body) = raw_body.filter(|body| !body.is_empty()) {
                    call.body.push(Node::Literal(body.to_string()));
                }
                Ok(Node::Block(call))
            }
            TagShape::Block {
                clauses,
            } => {
                self.depth += 1;
                if self.depth > self.settings.max_depth {
                    return Err(ParseError::TooDeep {
                        limit: self.settings.max_depth,
                        location: self.location(span),
                    });
                }

                let block = OpenBlock {
                    name,
                    clauses,
                    span,
                };
                let (body, mut stop) = self.parse_until(Some(&block))?;
                call.body = body;

                let mut seen_else = false;
                while let Stop::Clause {
                    name: clause_name,
                    markup,
                    span: clause_span,
                } = stop
                {
                    if seen_else {
                        return Err(ParseError::Mismatched {
                            found: clause_name.to_string(),
                            expected: format!("'end{name}' after 'else'"),
                            location: self.location(clause_span),
                        });
                    }
                    seen_else = clause_name == "else";

                    let mut clause_markup = self.markup(markup);
                    let args = tag.parse_clause(clause_name, &mut clause_markup)?;
                    clause_markup.expect_end()?;

                    let (body, next) = self.parse_until(Some(&block))?;
                    call.clauses.push(Clause {
                        name: clause_name.to_string(),
                        args,
                        body,
                        span: clause_span,
                    });
                    stop = next;
                }

                self.depth -= 1;
                Ok(Node::Block(call))
            }
        }
    }

    fn unknown_tag(&self, name: &str, span: Span, open: Option<&OpenBlock<'s>>) -> ParseError {
        let location = self.location(span);
        if name.starts_with("end") || self.registry.is_clause(name) {
            let expected = match open {
                Some(open) => format!("'end{}'", open.name),
                None => "no closing or clause tag outside a block".to_string(),
            };
            return ParseError::Mismatched {
                found: name.to_string(),
                expected,
                location,
            };
        }

        ParseError::UnknownTag {
            name: name.to_string(),
            suggestion: best_match(name, self.registry.tag_names()),
            location,
        }
    }

    fn markup(&self, text: &'s str) -> Markup<'s> {
        Markup::new(self.source, text, offset_in(self.source, text), self.settings.flavor)
            .with_max_depth(self.settings.max_depth)
    }

    fn location(&self, span: Span) -> Location {
        Location::from_offset(self.source, span.start)
    }
}

/// Byte offset of `part`, a subslice of `source`.
fn offset_in(source: &str, part: &str) -> usize {
    (part.as_ptr() as usize).saturating_sub(source.as_ptr() as usize)
}
