//! Expression lexer and parser for the markup inside directives.
//!
//! [`Markup`] is handed to every [`Tag`](crate::registry::Tag) at parse time,
//! so custom tags compile their arguments with the same grammar as the
//! standard library:
//!
//! ```text
//! filtered   := condition ( '|' ident ( ':' argument ( ',' argument )* )? )*
//! argument   := ident ':' expression | expression
//! condition  := comparison ( ( 'and' | 'or' ) comparison )*
//! comparison := expression ( op expression )?
//! expression := string | number | 'true' | 'false' | 'nil' | 'null'
//!             | 'empty' | 'blank' | '(' expression '..' expression ')'
//!             | path
//! path       := ( ident | '[' expression ']' ) ( '.' ident | '[' expression ']' )*
//! ```

use crate::ast::{CmpOp, Expr, FilterCall, FilteredExpr, LogicOp, Segment, Span, VariablePath};
use crate::config::Flavor;
use crate::constants::DEFAULT_MAX_DEPTH;
use crate::context::Value;
use crate::core::{Location, ParseError};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    DotDot,
    Comma,
    Colon,
    Pipe,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Op(CmpOp),
    /// `<>`, accepted as `!=` outside strict mode
    Diamond,
    Unterminated,
    Unknown(char),
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("'{name}'"),
            Self::Str(s) => format!("string \"{s}\""),
            Self::Int(i) => format!("number {i}"),
            Self::Float(f) => format!("number {f}"),
            Self::Dot => "'.'".into(),
            Self::DotDot => "'..'".into(),
            Self::Comma => "','".into(),
            Self::Colon => "':'".into(),
            Self::Pipe => "'|'".into(),
            Self::Assign => "'='".into(),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
            Self::LBracket => "'['".into(),
            Self::RBracket => "']'".into(),
            Self::Op(op) => format!("'{op}'"),
            Self::Diamond => "'<>'".into(),
            Self::Unterminated => "unterminated string".into(),
            Self::Unknown(c) => format!("character '{c}'"),
            Self::Eof => "end of markup".into(),
        }
    }
}

/// A token with its byte offset inside the markup.
#[derive(Debug, Clone)]
struct Spanned {
    tok: Tok,
    start: usize,
}

/// Cursor over the markup of one directive.
pub struct Markup<'s> {
    source: &'s str,
    text: &'s str,
    offset: usize,
    tokens: Vec<Spanned>,
    pos: usize,
    flavor: Flavor,
    /// Open `(` and `[` around the current token
    depth: usize,
    max_depth: usize,
}

impl<'s> Markup<'s> {
    /// Prepare `text`, which starts at byte `offset` of `source`.
    pub fn new(source: &'s str, text: &'s str, offset: usize, flavor: Flavor) -> Self {
        Self {
            source,
            text,
            offset,
            tokens: lex(text),
            pos: 0,
            flavor,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply ranges and brackets may nest.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Whether all tokens have been consumed.
    pub fn is_empty(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }

    /// The unconsumed markup text.
    pub fn rest(&self) -> &'s str {
        let start = self.tokens.get(self.pos).map_or(self.text.len(), |t| t.start);
        &self.text[start..]
    }

    /// Consume all remaining tokens and return their text, trimmed.
    pub fn take_rest(&mut self) -> &'s str {
        let rest = self.rest().trim();
        self.pos = self.tokens.len().saturating_sub(1);
        rest
    }

    /// A syntax error located at the current token.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        let at = self.tokens.get(self.pos).map_or(self.text.len(), |t| t.start);
        ParseError::Syntax {
            message: message.into(),
            location: Location::from_offset(self.source, self.offset + at),
        }
    }

    /// Finish parsing: strict markup must be fully consumed, the Liquid
    /// flavor ignores whatever is left.
    pub fn expect_end(&mut self) -> Result<(), ParseError> {
        if self.is_empty() {
            return Ok(());
        }
        if self.flavor.is_strict() {
            return Err(self.unexpected("end of markup"));
        }
        tracing::trace!(ignored = self.rest(), "Ignoring trailing markup");
        self.pos = self.tokens.len().saturating_sub(1);
        Ok(())
    }

    /// Consume the identifier `word` if it is next.
    pub fn eat_ident(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Tok::Ident(name) if name == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a `,` if it is next.
    pub fn eat_comma(&mut self) -> bool {
        self.eat(&Tok::Comma)
    }

    /// Consume a `:` if it is next.
    pub fn eat_colon(&mut self) -> bool {
        self.eat(&Tok::Colon)
    }

    /// Consume a single `=`.
    pub fn expect_assign(&mut self) -> Result<(), ParseError> {
        if self.eat(&Tok::Assign) { Ok(()) } else { Err(self.unexpected("'='")) }
    }

    /// Consume and return an identifier.
    pub fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// Whether the next two tokens are `identifier :`, i.e. a keyword argument.
    pub fn at_keyword(&self) -> bool {
        matches!(self.peek(), Tok::Ident(_)) && matches!(self.peek_at(1), Tok::Colon)
    }

    /// Parse `name: expression` if a keyword argument is next.
    pub fn keyword(&mut self) -> Result<Option<(String, Expr)>, ParseError> {
        if !self.at_keyword() {
            return Ok(None);
        }
        let name = self.ident()?;
        self.pos += 1;
        Ok(Some((name, self.expression()?)))
    }

    /// Parse an expression followed by a filter chain.
    ///
    /// Empty markup yields `nil` outside strict mode.
    pub fn filtered(&mut self) -> Result<FilteredExpr, ParseError> {
        if self.is_empty() {
            if self.flavor.is_strict() {
                return Err(self.error("expression expected"));
            }
            return Ok(FilteredExpr::bare(Expr::Literal(Value::Nil)));
        }

        let base = self.condition()?;
        let mut filters = Vec::new();
        while self.eat(&Tok::Pipe) {
            filters.push(self.filter_call()?);
        }
        Ok(FilteredExpr {
            base,
            filters,
        })
    }

    /// Parse a boolean condition; `and`/`or` group right-to-left.
    pub fn condition(&mut self) -> Result<Expr, ParseError> {
        let first = self.comparison()?;
        let mut rest = Vec::new();
        loop {
            let op = if self.eat_ident("and") {
                LogicOp::And
            } else if self.eat_ident("or") {
                LogicOp::Or
            } else {
                break;
            };
            rest.push((op, self.comparison()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Logic(Box::new(first), rest))
        }
    }

    /// Parse a single operand: literal, range or variable path.
    pub fn expression(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token {
            Tok::Str(s) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Str(s)))
            }
            Tok::Int(i) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Int(i)))
            }
            Tok::Float(f) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Float(f)))
            }
            Tok::LParen => self.nested(|markup| {
                markup.pos += 1;
                let start = markup.expression()?;
                if !markup.eat(&Tok::DotDot) {
                    return Err(markup.unexpected("'..'"));
                }
                let end = markup.expression()?;
                if !markup.eat(&Tok::RParen) {
                    return Err(markup.unexpected("')'"));
                }
                Ok(Expr::Range(Box::new(start), Box::new(end)))
            }),
            Tok::Ident(name) => {
                let keyword = match name.as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    "nil" | "null" => Some(Value::Nil),
                    "empty" => Some(Value::Empty),
                    "blank" => Some(Value::Blank),
                    _ => None,
                };
                match keyword {
                    Some(value) if !matches!(self.peek_at(1), Tok::Dot | Tok::LBracket) => {
                        self.pos += 1;
                        Ok(Expr::Literal(value))
                    }
                    _ => self.path(),
                }
            }
            Tok::LBracket => self.path(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.expression()?;
        let op = match self.peek() {
            Tok::Op(op) => *op,
            Tok::Diamond if self.flavor.is_strict() => {
                return Err(self.error("operator '<>' is not supported; use '!='"));
            }
            Tok::Diamond => CmpOp::Ne,
            Tok::Ident(word) if word == "contains" => CmpOp::Contains,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.expression()?;
        Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
    }

    fn path(&mut self) -> Result<Expr, ParseError> {
        let root = if self.eat(&Tok::LBracket) {
            let key = self.bracketed()?;
            match key {
                Segment::Key(name) => name,
                _ => return Err(self.error("variable name must be a string")),
            }
        } else {
            self.ident()?
        };

        let mut path = VariablePath::new(root);
        loop {
            if self.eat(&Tok::Dot) {
                path.segments.push(Segment::Key(self.ident()?));
            } else if self.eat(&Tok::LBracket) {
                let segment = self.bracketed()?;
                path.segments.push(segment);
            } else {
                break;
            }
        }
        Ok(Expr::Path(path))
    }

    /// The inside of `[...]`, after the opening bracket.
    fn bracketed(&mut self) -> Result<Segment, ParseError> {
        self.nested(|markup| {
            let segment = match markup.expression()? {
                Expr::Literal(Value::Str(key)) => Segment::Key(key),
                Expr::Literal(Value::Int(index)) => Segment::Index(index),
                other => Segment::Dynamic(Box::new(other)),
            };
            if !markup.eat(&Tok::RBracket) {
                return Err(markup.unexpected("']'"));
            }
            Ok(segment)
        })
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= self.max_depth {
            let at = self.tokens.get(self.pos).map_or(self.text.len(), |t| t.start);
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
                location: Location::from_offset(self.source, self.offset + at),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn filter_call(&mut self) -> Result<FilterCall, ParseError> {
        let start = self.tokens.get(self.pos).map_or(0, |t| t.start);
        let name = self.ident()?;
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        if self.eat_colon() {
            loop {
                if let Some(pair) = self.keyword()? {
                    kwargs.push(pair);
                } else {
                    args.push(self.expression()?);
                }
                if !self.eat_comma() {
                    break;
                }
            }
        }

        let end = self.tokens.get(self.pos).map_or(self.text.len(), |t| t.start);
        Ok(FilterCall {
            name,
            args,
            kwargs,
            span: Span::new(self.offset + start, self.offset + end),
        })
    }

    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Tok {
        self.tokens.get(self.pos + ahead).map_or(&Tok::Eof, |t| &t.tok)
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        self.error(format!("expected {expected}, found {}", self.peek().describe()))
    }
}

fn lex(text: &str) -> Vec<Spanned> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < text.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let two = text.get(i..i + 2).unwrap_or("");
        let tok = match two {
            "==" => Some(Tok::Op(CmpOp::Eq)),
            "!=" => Some(Tok::Op(CmpOp::Ne)),
            "<>" => Some(Tok::Diamond),
            "<=" => Some(Tok::Op(CmpOp::Le)),
            ">=" => Some(Tok::Op(CmpOp::Ge)),
            ".." => Some(Tok::DotDot),
            _ => None,
        };
        if let Some(tok) = tok {
            i += 2;
            tokens.push(Spanned {
                tok,
                start,
            });
            continue;
        }

        let tok = match c {
            b'.' => Tok::Dot,
            b',' => Tok::Comma,
            b':' => Tok::Colon,
            b'|' => Tok::Pipe,
            b'=' => Tok::Assign,
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            b'[' => Tok::LBracket,
            b']' => Tok::RBracket,
            b'<' => Tok::Op(CmpOp::Lt),
            b'>' => Tok::Op(CmpOp::Gt),
            b'"' | b'\'' => {
                let (tok, len) = lex_string(&text[i..]);
                i += len;
                tokens.push(Spanned {
                    tok,
                    start,
                });
                continue;
            }
            b'0'..=b'9' | b'-' if is_number_start(&text[i..]) => {
                let (tok, len) = lex_number(&text[i..]);
                i += len;
                tokens.push(Spanned {
                    tok,
                    start,
                });
                continue;
            }
            _ => {
                let ch = text[i..].chars().next().unwrap_or('\0');
                if ch.is_alphabetic() || ch == '_' {
                    let len = ident_len(&text[i..]);
                    let name = text[i..i + len].to_string();
                    i += len;
                    tokens.push(Spanned {
                        tok: Tok::Ident(name),
                        start,
                    });
                    continue;
                }
                i += ch.len_utf8();
                tokens.push(Spanned {
                    tok: Tok::Unknown(ch),
                    start,
                });
                continue;
            }
        };
        i += 1;
        tokens.push(Spanned {
            tok,
            start,
        });
    }

    tokens.push(Spanned {
        tok: Tok::Eof,
        start: text.len(),
    });
    tokens
}

fn is_number_start(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn lex_number(text: &str) -> (Tok, usize) {
    let bytes = text.as_bytes();
    let mut len = usize::from(bytes[0] == b'-');
    while len < bytes.len() && bytes[len].is_ascii_digit() {
        len += 1;
    }

    let is_float = len + 1 < bytes.len() && bytes[len] == b'.' && bytes[len + 1].is_ascii_digit();
    if is_float {
        len += 1;
        while len < bytes.len() && bytes[len].is_ascii_digit() {
            len += 1;
        }
        let tok = text[..len].parse().map_or(Tok::Unknown('.'), Tok::Float);
        return (tok, len);
    }

    match text[..len].parse() {
        Ok(i) => (Tok::Int(i), len),
        // Integers beyond i64 degrade to floats
        Err(_) => (text[..len].parse().map_or(Tok::Unknown('-'), Tok::Float), len),
    }
}

fn lex_string(text: &str) -> (Tok, usize) {
    let quote = text.as_bytes()[0] as char;
    match text[1..].find(quote) {
        Some(close) => (Tok::Str(text[1..1 + close].to_string()), close + 2),
        None => (Tok::Unterminated, text.len()),
    }
}

/// Identifiers may contain `-` after the first character and end with `?`.
fn ident_len(text: &str) -> usize {
    let mut len = 0;
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' || (len > 0 && ch == '-') {
            len += ch.len_utf8();
        } else {
            break;
        }
    }
    if text[len..].starts_with('?') {
        len += 1;
    }
    len
}
