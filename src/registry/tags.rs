//! The standard tags.
//!
//! | Tag | Shape | Notes |
//! |-----|-------|-------|
//! | `assign`, `capture` | simple, block | bind through [`Context::assign`] |
//! | `if`, `unless` | block: `elsif`, `else` | |
//! | `case` | block: `when`, `else` | every matching `when` renders |
//! | `for` | block: `else` | `limit:`, `offset:`, `reversed`, `forloop` |
//! | `break`, `continue` | simple | handled by the enclosing loop |
//! | `tablerow` | block | `cols:`, `limit:`, `offset:`, `tablerowloop` |
//! | `cycle` | simple | optional `group:` prefix |
//! | `increment`, `decrement` | simple | counters separate from variables |
//! | `echo` | simple | output as a tag |
//! | `include` | simple | literal names of known partials link at parse time |
//! | `ifchanged` | block | |
//! | `raw`, `comment` | raw | |

use std::sync::Arc;

use crate::ast::{Document, Expr, LoopArgs, Node, TagArgs, TagCall};
use crate::context::{Context, Interrupt, Object, Value, range_len};
use crate::core::{ParseError, RenderError};
use crate::parser::Markup;
use crate::render::{evaluate, evaluate_filtered, is_true, render_nodes, render_to_string};

use super::{Registry, Tag, TagShape};

/// Add the standard tags to `registry`.
pub(super) fn register(registry: Registry) -> Registry {
    registry
        .with_tag("assign", Assign)
        .with_tag("capture", Capture)
        .with_tag("if", If)
        .with_tag("unless", Unless)
        .with_tag("case", Case)
        .with_tag("for", For)
        .with_tag("break", LoopControl(Interrupt::Break))
        .with_tag("continue", LoopControl(Interrupt::Continue))
        .with_tag("tablerow", TableRow)
        .with_tag("cycle", Cycle)
        .with_tag("increment", Counter {
            step: 1,
        })
        .with_tag("decrement", Counter {
            step: -1,
        })
        .with_tag("echo", Echo)
        .with_tag("include", Include)
        .with_tag("ifchanged", IfChanged)
        .with_tag("raw", Raw)
        .with_tag("comment", Comment)
}

fn malformed(call: &TagCall) -> RenderError {
    RenderError::TypeMismatch {
        message: format!("'{}' received arguments it cannot render", call.name),
    }
}

/// Render a body one scope deeper.
fn render_body(body: &[Node], ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
    ctx.nested(|ctx| render_nodes(body, ctx, out))
}

struct Assign;

impl Tag for Assign {
    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        let target = markup.ident()?;
        markup.expect_assign()?;
        let value = markup.filtered()?;
        Ok(TagArgs::Assign {
            target,
            value,
        })
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, _out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Assign {
            target,
            value,
        } = &call.args
        else {
            return Err(malformed(call));
        };
        let value = evaluate_filtered(value, ctx)?;
        ctx.assign(target.clone(), value)
    }
}

struct Capture;

impl Tag for Capture {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: &[],
        }
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Capture {
            target: markup.ident()?,
        })
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, _out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Capture {
            target,
        } = &call.args
        else {
            return Err(malformed(call));
        };
        let captured = render_to_string(&call.body, ctx)?;
        ctx.assign(target.clone(), Value::Str(captured))
    }
}

/// Render the first branch whose condition holds.
///
/// `first` decides the block's own body; clauses are tried in order after it.
fn render_branches(
    call: &TagCall,
    first: bool,
    ctx: &mut Context<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    if first {
        return render_body(&call.body, ctx, out);
    }
    for clause in &call.clauses {
        let taken = match &clause.args {
            TagArgs::Condition(condition) => is_true(condition, ctx)?,
            _ => clause.name == "else",
        };
        if taken {
            return render_body(&clause.body, ctx, out);
        }
    }
    Ok(())
}

fn parse_conditional_clause(name: &str, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
    match name {
        "elsif" => Ok(TagArgs::Condition(markup.condition()?)),
        _ => Ok(TagArgs::Empty),
    }
}

const CONDITIONAL_CLAUSES: &[&str] = &["elsif", "else"];

struct If;

impl Tag for If {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: CONDITIONAL_CLAUSES,
        }
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Condition(markup.condition()?))
    }

    fn parse_clause(&self, name: &str, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        parse_conditional_clause(name, markup)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Condition(condition) = &call.args else {
            return Err(malformed(call));
        };
        let first = is_true(condition, ctx)?;
        render_branches(call, first, ctx, out)
    }
}

struct Unless;

impl Tag for Unless {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: CONDITIONAL_CLAUSES,
        }
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Condition(markup.condition()?))
    }

    fn parse_clause(&self, name: &str, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        parse_conditional_clause(name, markup)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Condition(condition) = &call.args else {
            return Err(malformed(call));
        };
        let first = !is_true(condition, ctx)?;
        render_branches(call, first, ctx, out)
    }
}

struct Case;

impl Tag for Case {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: &["when", "else"],
        }
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Values(vec![markup.expression()?]))
    }

    fn parse_clause(&self, name: &str, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        if name != "when" {
            return Ok(TagArgs::Empty);
        }
        let mut values = vec![markup.expression()?];
        while markup.eat_comma() || markup.eat_ident("or") {
            values.push(markup.expression()?);
        }
        Ok(TagArgs::Values(values))
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Values(subject) = &call.args else {
            return Err(malformed(call));
        };
        let Some(subject) = subject.first() else {
            return Err(malformed(call));
        };
        let subject = evaluate(subject, ctx)?;

        let mut matched = false;
        for clause in &call.clauses {
            let render = match &clause.args {
                TagArgs::Values(candidates) => {
                    let mut any = false;
                    for candidate in candidates {
                        if evaluate(candidate, ctx)?.liquid_eq(&subject) {
                            any = true;
                            break;
                        }
                    }
                    matched |= any;
                    any
                }
                _ => !matched,
            };
            if render {
                render_body(&clause.body, ctx, out)?;
            }
        }
        Ok(())
    }
}

/// Parse `variable in collection` followed by loop options.
fn parse_loop(markup: &mut Markup<'_>, tablerow: bool) -> Result<LoopArgs, ParseError> {
    let variable = markup.ident()?;
    if !markup.eat_ident("in") {
        return Err(markup.error(format!("expected 'in' after '{variable}'")));
    }
    let collection = markup.expression()?;

    let mut args = LoopArgs {
        variable,
        collection,
        limit: None,
        offset: None,
        cols: None,
        reversed: false,
    };

    loop {
        markup.eat_comma();
        if !tablerow && markup.eat_ident("reversed") {
            args.reversed = true;
            continue;
        }
        let Some((name, value)) = markup.keyword()? else {
            break;
        };
        match name.as_str() {
            "limit" => args.limit = Some(value),
            "offset" => args.offset = Some(value),
            "cols" if tablerow => args.cols = Some(value),
            other if markup.flavor().is_strict() => {
                return Err(markup.error(format!("unknown loop option '{other}'")));
            }
            other => tracing::trace!(option = other, "Ignoring unknown loop option"),
        }
    }
    Ok(args)
}

/// The elements a loop visits after `offset`, `limit` and `reversed`.
///
/// Ranges stay lazy so `(1..1000000000)` costs nothing until iterated.
enum LoopItems {
    Range {
        start: i64,
        len: usize,
        reversed: bool,
    },
    List(Vec<Value>),
}

impl LoopItems {
    fn len(&self) -> usize {
        match self {
            Self::Range {
                len,
                ..
            } => *len,
            Self::List(items) => items.len(),
        }
    }

    fn get(&self, index: usize) -> Value {
        match self {
            Self::Range {
                start,
                len,
                reversed,
            } => {
                let step = if *reversed { len - 1 - index } else { index };
                Value::Int(start.saturating_add(step as i64))
            }
            Self::List(items) => items.get(index).cloned().unwrap_or_default(),
        }
    }
}

fn loop_items(args: &LoopArgs, ctx: &Context<'_>) -> Result<LoopItems, RenderError> {
    let offset = match &args.offset {
        Some(expr) => count(evaluate(expr, ctx)?, "offset", ctx)?,
        None => 0,
    };
    let limit = match &args.limit {
        Some(expr) => Some(count(evaluate(expr, ctx)?, "limit", ctx)?),
        None => None,
    };

    let collection = evaluate(&args.collection, ctx)?;
    if let Value::Range(start, end) = collection {
        let total = range_len(start, end);
        let skip = offset.min(total);
        let remaining = total - skip;
        return Ok(LoopItems::Range {
            start: start.saturating_add(skip as i64),
            len: limit.map_or(remaining, |limit| limit.min(remaining)),
            reversed: args.reversed,
        });
    }

    let all = match collection {
        Value::Array(items) => items,
        value @ Value::Object(_) => value.to_vec(),
        Value::Str(s) if s.is_empty() => Vec::new(),
        value @ Value::Str(_) => vec![value],
        Value::Nil | Value::Empty | Value::Blank => Vec::new(),
        other if ctx.flavor().is_strict() => {
            return Err(RenderError::TypeMismatch {
                message: format!("cannot iterate over {}", other.type_name()),
            });
        }
        _ => Vec::new(),
    };

    let mut items: Vec<Value> = all.into_iter().skip(offset).take(limit.unwrap_or(usize::MAX)).collect();
    if args.reversed {
        items.reverse();
    }
    Ok(LoopItems::List(items))
}

/// Interpret a loop option as a non-negative count.
fn count(value: Value, option: &str, ctx: &Context<'_>) -> Result<usize, RenderError> {
    let number = match &value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => Some(*f as i64),
        Value::Str(s) => s.trim().parse().ok(),
        Value::Nil => Some(0),
        _ => None,
    };
    match number {
        Some(n) => Ok(usize::try_from(n.max(0)).unwrap_or(usize::MAX)),
        None if ctx.flavor().is_strict() => Err(RenderError::TypeMismatch {
            message: format!("loop option '{option}' must be a number, got {}", value.type_name()),
        }),
        None => Ok(0),
    }
}

fn forloop(index: usize, length: usize, parent: Option<&Value>) -> Value {
    let mut map = Object::new();
    map.insert("first".into(), Value::Bool(index == 0));
    map.insert("index".into(), Value::from(index + 1));
    map.insert("index0".into(), Value::from(index));
    map.insert("last".into(), Value::Bool(index + 1 == length));
    map.insert("length".into(), Value::from(length));
    map.insert("rindex".into(), Value::from(length - index));
    map.insert("rindex0".into(), Value::from(length - index - 1));
    if let Some(parent) = parent {
        map.insert("parentloop".into(), parent.clone());
    }
    Value::Object(map)
}

struct For;

impl Tag for For {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: &["else"],
        }
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        parse_loop(markup, false).map(TagArgs::Loop)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Loop(args) = &call.args else {
            return Err(malformed(call));
        };
        let items = loop_items(args, ctx)?;
        let length = items.len();

        if length == 0 {
            return match call.clause("else") {
                Some(clause) => render_body(&clause.body, ctx, out),
                None => Ok(()),
            };
        }

        ctx.guard().check_iteration(length)?;
        let parent = ctx.lookup("forloop").cloned();

        ctx.nested(|ctx| {
            for index in 0..length {
                ctx.guard().check_iteration(index + 1)?;
                ctx.set_local(args.variable.clone(), items.get(index));
                ctx.set_local("forloop", forloop(index, length, parent.as_ref()));

                render_nodes(&call.body, ctx, out)?;
                if ctx.take_interrupt() == Some(Interrupt::Break) {
                    break;
                }
            }
            Ok(())
        })
    }
}

struct LoopControl(Interrupt);

impl Tag for LoopControl {
    fn parse(&self, _markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Empty)
    }

    fn render(&self, _call: &TagCall, ctx: &mut Context<'_>, _out: &mut String) -> Result<(), RenderError> {
        ctx.interrupt(self.0);
        Ok(())
    }
}

struct TableRow;

impl Tag for TableRow {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: &[],
        }
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        parse_loop(markup, true).map(TagArgs::Loop)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Loop(args) = &call.args else {
            return Err(malformed(call));
        };
        let items = loop_items(args, ctx)?;
        let length = items.len();
        let cols = match &args.cols {
            Some(expr) => count(evaluate(expr, ctx)?, "cols", ctx)?,
            None => length,
        }
        .max(1);

        if length > 0 {
            ctx.guard().check_iteration(length)?;
        }

        out.push_str("<tr class=\"row1\">\n");
        ctx.nested(|ctx| {
            for index in 0..length {
                ctx.guard().check_iteration(index + 1)?;
                let col0 = index % cols;
                let row = index / cols + 1;

                let mut tablerowloop = Object::new();
                tablerowloop.insert("col".into(), Value::from(col0 + 1));
                tablerowloop.insert("col0".into(), Value::from(col0));
                tablerowloop.insert("col_first".into(), Value::Bool(col0 == 0));
                tablerowloop.insert("col_last".into(), Value::Bool(col0 + 1 == cols));
                tablerowloop.insert("row".into(), Value::from(row));
                if let Value::Object(common) = forloop(index, length, None) {
                    tablerowloop.extend(common);
                }

                ctx.set_local(args.variable.clone(), items.get(index));
                ctx.set_local("tablerowloop", Value::Object(tablerowloop));

                out.push_str(&format!("<td class=\"col{}\">", col0 + 1));
                render_nodes(&call.body, ctx, out)?;
                out.push_str("</td>");

                let stop = ctx.take_interrupt() == Some(Interrupt::Break);
                if col0 + 1 == cols && index + 1 != length && !stop {
                    out.push_str(&format!("</tr>\n<tr class=\"row{}\">", row + 1));
                }
                if stop {
                    break;
                }
            }
            Ok(())
        })?;
        out.push_str("</tr>\n");
        Ok(())
    }
}

struct Cycle;

impl Tag for Cycle {
    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        let key = markup.rest().trim().to_string();
        let first = markup.expression()?;

        let (group, mut values) = if markup.eat_colon() {
            (Some(first), vec![markup.expression()?])
        } else {
            (None, vec![first])
        };
        while markup.eat_comma() {
            values.push(markup.expression()?);
        }

        Ok(TagArgs::Cycle {
            group,
            values,
            key,
        })
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Cycle {
            group,
            values,
            key,
        } = &call.args
        else {
            return Err(malformed(call));
        };

        let key = match group {
            Some(group) => format!("group:{}", evaluate(group, ctx)?.to_text()),
            None => key.clone(),
        };
        let position = ctx.next_cycle(&key, values.len());
        if let Some(expr) = values.get(position) {
            out.push_str(&evaluate(expr, ctx)?.to_text());
        }
        Ok(())
    }
}

struct Counter {
    step: i64,
}

impl Tag for Counter {
    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Counter(markup.ident()?))
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Counter(name) = &call.args else {
            return Err(malformed(call));
        };
        let before = ctx.step_counter(name, self.step);
        let shown = if self.step > 0 { before } else { before.saturating_add(self.step) };
        out.push_str(&shown.to_string());
        Ok(())
    }
}

struct Echo;

impl Tag for Echo {
    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        markup.filtered().map(TagArgs::Filtered)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Filtered(expr) = &call.args else {
            return Err(malformed(call));
        };
        out.push_str(&evaluate_filtered(expr, ctx)?.to_text());
        Ok(())
    }
}

struct Include;

impl Tag for Include {
    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        let partial = markup.expression()?;
        let with = if markup.eat_ident("with") { Some(markup.expression()?) } else { None };

        let mut bindings = Vec::new();
        loop {
            markup.eat_comma();
            match markup.keyword()? {
                Some(binding) => bindings.push(binding),
                None => break,
            }
        }

        Ok(TagArgs::Include {
            partial,
            with,
            bindings,
        })
    }

    fn link(&self, args: &TagArgs, registry: &Registry) -> Option<Arc<Document>> {
        match args {
            TagArgs::Include {
                partial: Expr::Literal(Value::Str(name)),
                with: None,
                bindings,
            } if bindings.is_empty() => registry.partial(name).cloned(),
            _ => None,
        }
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let TagArgs::Include {
            partial,
            with,
            bindings,
        } = &call.args
        else {
            return Err(malformed(call));
        };

        let name = evaluate(partial, ctx)?.to_text().into_owned();
        let Some(document) = ctx.registry().partial(&name) else {
            return Err(RenderError::UnknownPartial {
                name,
            });
        };

        let with = with.as_ref().map(|expr| evaluate(expr, ctx)).transpose()?;
        let mut values = Vec::with_capacity(bindings.len());
        for (key, expr) in bindings {
            values.push((key.clone(), evaluate(expr, ctx)?));
        }

        tracing::trace!(partial = %name, "Including partial");
        ctx.nested(|ctx| {
            if let Some(value) = with {
                ctx.set_local(partial_alias(&name), value);
            }
            for (key, value) in values {
                ctx.set_local(key, value);
            }
            render_nodes(&document.nodes, ctx, out)
        })
    }
}

/// The variable a `with` value is bound to: the partial's base name.
fn partial_alias(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.split('.').next().unwrap_or(base)
}

struct IfChanged;

impl Tag for IfChanged {
    fn shape(&self) -> TagShape {
        TagShape::Block {
            clauses: &[],
        }
    }

    fn parse(&self, _markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Empty)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        let rendered = render_to_string(&call.body, ctx)?;
        if ctx.ifchanged(&rendered) {
            out.push_str(&rendered);
        }
        Ok(())
    }
}

struct Raw;

impl Tag for Raw {
    fn shape(&self) -> TagShape {
        TagShape::Raw
    }

    fn parse(&self, _markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        Ok(TagArgs::Empty)
    }

    fn render(&self, call: &TagCall, ctx: &mut Context<'_>, out: &mut String) -> Result<(), RenderError> {
        render_nodes(&call.body, ctx, out)
    }
}

struct Comment;

impl Tag for Comment {
    fn shape(&self) -> TagShape {
        TagShape::Raw
    }

    fn parse(&self, markup: &mut Markup<'_>) -> Result<TagArgs, ParseError> {
        markup.take_rest();
        Ok(TagArgs::Empty)
    }

    fn render(&self, _call: &TagCall, _ctx: &mut Context<'_>, _out: &mut String) -> Result<(), RenderError> {
        Ok(())
    }
}
