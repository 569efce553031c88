//! The node model produced by the parser.
//!
//! A [`Document`] is an ordered list of [`Node`]s. Nodes are immutable once
//! the parser returns; block nodes own their bodies and clauses, and nested
//! documents are shared through [`Arc`], so the tree is acyclic and cheap to
//! share between threads.
//!
//! Expressions are compiled once at parse time into [`Expr`] and
//! [`FilteredExpr`] trees; the renderer never re-parses markup.

use std::fmt;
use std::sync::Arc;

use crate::context::Value;

/// Byte range of a construct in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
        }
    }
}

/// Root of a compiled template or partial.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Partial name, `None` for top-level templates
    pub name: Option<String>,
    pub nodes: Vec<Node>,
}

/// One element of the node tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, already whitespace-normalized
    Literal(String),
    /// `{{ expression | filters }}`
    Output(Output),
    /// A tag without a body, e.g. `{% assign %}`
    Tag(TagCall),
    /// A tag with a body and optional clauses, e.g. `{% if %}...{% endif %}`
    Block(TagCall),
    /// A separately compiled document linked into this one
    Document(Arc<Document>),
}

/// An output directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub expr: FilteredExpr,
    pub span: Span,
}

/// A compiled tag or block invocation handed to its [`Tag`](crate::registry::Tag)
/// capability at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCall {
    pub name: String,
    pub args: TagArgs,
    /// Nodes before the first clause; empty for simple tags
    pub body: Vec<Node>,
    /// Clauses in source order; `else` is always last
    pub clauses: Vec<Clause>,
    pub span: Span,
}

impl TagCall {
    /// The first clause with the given name.
    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.iter().find(|clause| clause.name == name)
    }
}

/// A branch of a block, such as `elsif`, `when` or `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: String,
    pub args: TagArgs,
    pub body: Vec<Node>,
    pub span: Span,
}

/// Compiled arguments of a tag or clause.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TagArgs {
    #[default]
    Empty,
    /// Boolean condition (`if`, `elsif`, `unless`)
    Condition(Expr),
    /// `assign target = value`
    Assign { target: String, value: FilteredExpr },
    /// `capture target`
    Capture { target: String },
    /// `for` and `tablerow` headers
    Loop(LoopArgs),
    /// `cycle [group:] value, ...`
    Cycle {
        group: Option<Expr>,
        values: Vec<Expr>,
        /// Register key used when no group is given
        key: String,
    },
    /// `include partial [with value] [, key: value ...]`
    Include {
        partial: Expr,
        with: Option<Expr>,
        bindings: Vec<(String, Expr)>,
    },
    /// `increment name` / `decrement name`
    Counter(String),
    /// A list of expressions (`case` subject, `when` alternatives)
    Values(Vec<Expr>),
    /// A full output expression (`echo`)
    Filtered(FilteredExpr),
    /// Unparsed markup, for tags that interpret their own arguments
    Markup(String),
}

/// Header of an iteration construct.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopArgs {
    pub variable: String,
    pub collection: Expr,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    /// Columns per row, `tablerow` only
    pub cols: Option<Expr>,
    pub reversed: bool,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Contains,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Contains => "contains",
        };
        f.write_str(op)
    }
}

/// Boolean connectives between conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// A value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal, including the `empty` and `blank` keywords
    Literal(Value),
    /// `(start..end)`
    Range(Box<Expr>, Box<Expr>),
    /// Variable lookup
    Path(VariablePath),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
    /// `a and b or c ...` kept flat; groups right-to-left, so the example
    /// reads `a and (b or c)`
    Logic(Box<Expr>, Vec<(LogicOp, Expr)>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }
}

/// A variable reference such as `product.variants[0].title`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariablePath {
    pub root: String,
    pub segments: Vec<Segment>,
}

/// One step of a [`VariablePath`] after its root.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or `["name"]`
    Key(String),
    /// `[3]` or `[-1]`
    Index(i64),
    /// `[expression]`
    Dynamic(Box<Expr>),
}

impl VariablePath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            segments: Vec::new(),
        }
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Dynamic(_) => f.write_str("[...]")?,
            }
        }
        Ok(())
    }
}

/// An expression followed by a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredExpr {
    pub base: Expr,
    pub filters: Vec<FilterCall>,
}

impl FilteredExpr {
    /// An expression without filters.
    pub fn bare(base: Expr) -> Self {
        Self {
            base,
            filters: Vec::new(),
        }
    }
}

/// One `| name: args` step.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub kwargs: Vec<(String, Expr)>,
    pub span: Span,
}
