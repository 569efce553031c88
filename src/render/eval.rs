//! Expression evaluation.

use std::borrow::Cow;
use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::ast::{CmpOp, Expr, FilterCall, FilteredExpr, LogicOp, Segment, VariablePath};
use crate::constants::MAX_LISTED_VARIABLES;
use crate::context::{Context, Value};
use crate::core::{RenderError, best_match};
use crate::registry::FilterArgs;
use crate::registry::filters::unwrap_limit;

/// Evaluate an expression to a value.
pub fn evaluate(expr: &Expr, ctx: &Context<'_>) -> Result<Value, RenderError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Range(start, end) => {
            let start = range_bound(evaluate(start, ctx)?, ctx)?;
            let end = range_bound(evaluate(end, ctx)?, ctx)?;
            Ok(Value::Range(start, end))
        }
        Expr::Path(path) => resolve(path, ctx).map(Cow::into_owned),
        Expr::Compare(left, op, right) => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            compare(&left, *op, &right, ctx).map(Value::Bool)
        }
        Expr::Logic(first, rest) => logic(first, rest, ctx).map(Value::Bool),
    }
}

/// Right-grouped `and`/`or`: each operand either settles the result or
/// hands over to the rest of the chain.
fn logic(first: &Expr, rest: &[(LogicOp, Expr)], ctx: &Context<'_>) -> Result<bool, RenderError> {
    let mut current = first;
    for (op, next) in rest {
        let value = is_true(current, ctx)?;
        match op {
            LogicOp::And if !value => return Ok(false),
            LogicOp::Or if value => return Ok(true),
            _ => current = next,
        }
    }
    is_true(current, ctx)
}

/// Evaluate an expression for its truthiness.
pub fn is_true(expr: &Expr, ctx: &Context<'_>) -> Result<bool, RenderError> {
    evaluate(expr, ctx).map(|value| value.is_truthy())
}

/// Evaluate an expression and run it through its filters.
pub fn evaluate_filtered(expr: &FilteredExpr, ctx: &Context<'_>) -> Result<Value, RenderError> {
    let mut value = evaluate(&expr.base, ctx)?;
    for call in &expr.filters {
        value = apply_filter(call, value, ctx)?;
    }
    Ok(value)
}

fn apply_filter(call: &FilterCall, input: Value, ctx: &Context<'_>) -> Result<Value, RenderError> {
    let registry = ctx.registry();
    let Some(filter) = registry.filter(&call.name) else {
        return Err(RenderError::UnknownFilter {
            name: call.name.clone(),
            suggestion: best_match(&call.name, registry.filter_names()),
        });
    };

    let positional = call.args.iter().map(|arg| evaluate(arg, ctx)).collect::<Result<Vec<_>, _>>()?;
    let mut keywords = IndexMap::with_capacity(call.kwargs.len());
    for (name, arg) in &call.kwargs {
        keywords.insert(name.clone(), evaluate(arg, ctx)?);
    }
    let args = FilterArgs::new(positional, keywords);

    let output = filter.invoke(&input, &args, ctx).map_err(|error| match unwrap_limit(error) {
        Ok(limit) => limit,
        Err(source) => RenderError::Filter {
            name: call.name.clone(),
            source,
        },
    })?;
    ctx.guard().check_value(&output)?;
    Ok(output)
}

/// Compare two values with a comparison operator.
pub fn compare(left: &Value, op: CmpOp, right: &Value, ctx: &Context<'_>) -> Result<bool, RenderError> {
    let ordering = |accept: fn(Ordering) -> bool| match left.liquid_cmp(right) {
        Some(ordering) => Ok(accept(ordering)),
        None if ctx.flavor().is_strict() => Err(RenderError::TypeMismatch {
            message: format!("cannot compare {} with {} using '{op}'", left.type_name(), right.type_name()),
        }),
        None => Ok(false),
    };

    match op {
        CmpOp::Eq => Ok(left.liquid_eq(right)),
        CmpOp::Ne => Ok(!left.liquid_eq(right)),
        CmpOp::Lt => ordering(Ordering::is_lt),
        CmpOp::Gt => ordering(Ordering::is_gt),
        CmpOp::Le => ordering(Ordering::is_le),
        CmpOp::Ge => ordering(Ordering::is_ge),
        CmpOp::Contains => Ok(contains(left, right)),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Str(s) => s.contains(&*needle.to_text()),
        Value::Array(items) => items.iter().any(|item| item.liquid_eq(needle)),
        Value::Object(map) => map.contains_key(&*needle.to_text()),
        Value::Range(start, end) => match needle {
            Value::Int(i) => (*start..=*end).contains(i),
            _ => false,
        },
        _ => false,
    }
}

fn range_bound(value: Value, ctx: &Context<'_>) -> Result<i64, RenderError> {
    match value {
        Value::Int(i) => Ok(i),
        Value::Float(f) => Ok(f as i64),
        Value::Str(ref s) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(i),
            Err(_) => range_mismatch(&value, ctx),
        },
        Value::Nil if !ctx.flavor().is_strict() => Ok(0),
        other => range_mismatch(&other, ctx),
    }
}

fn range_mismatch(value: &Value, ctx: &Context<'_>) -> Result<i64, RenderError> {
    if ctx.flavor().is_strict() {
        Err(RenderError::TypeMismatch {
            message: format!("range bound must be an integer, got {}", value.type_name()),
        })
    } else {
        Ok(0)
    }
}

/// Resolve a variable path against the scope chain.
///
/// Missing names are `nil` in Liquid templates and an
/// [`RenderError::UndefinedVariable`] in strict ones.
pub fn resolve<'c>(path: &VariablePath, ctx: &'c Context<'_>) -> Result<Cow<'c, Value>, RenderError> {
    let Some(root) = ctx.lookup(&path.root) else {
        return undefined(path.root.clone(), Some(path.root.as_str()), ctx);
    };

    let mut current = Cow::Borrowed(root);
    for (index, segment) in path.segments.iter().enumerate() {
        let key = match segment {
            Segment::Key(name) => Key::Name(Cow::Borrowed(name.as_str())),
            Segment::Index(i) => Key::Index(*i),
            Segment::Dynamic(expr) => match evaluate(expr, ctx)? {
                Value::Int(i) => Key::Index(i),
                Value::Float(f) => Key::Index(f as i64),
                other => Key::Name(Cow::Owned(other.to_text().into_owned())),
            },
        };

        current = match step(current, &key) {
            Some(next) => next,
            None => {
                let partial = VariablePath {
                    root: path.root.clone(),
                    segments: path.segments[..=index].to_vec(),
                };
                return undefined(partial.to_string(), None, ctx);
            }
        };
    }
    Ok(current)
}

enum Key<'k> {
    Name(Cow<'k, str>),
    Index(i64),
}

fn step<'c>(current: Cow<'c, Value>, key: &Key<'_>) -> Option<Cow<'c, Value>> {
    match current {
        Cow::Borrowed(value) => child(value, key),
        Cow::Owned(value) => child(&value, key).map(|child| Cow::Owned(child.into_owned())),
    }
}

fn child<'c>(value: &'c Value, key: &Key<'_>) -> Option<Cow<'c, Value>> {
    match key {
        Key::Index(index) => value.get_index(*index),
        Key::Name(name) => {
            if let Some(found) = value.get(name) {
                return Some(Cow::Borrowed(found));
            }
            match &**name {
                "size" => value.size().map(|size| Cow::Owned(Value::from(size))),
                "first" => value.get_index(0),
                "last" => value.get_index(-1),
                _ => None,
            }
        }
    }
}

fn undefined<'c>(name: String, root: Option<&str>, ctx: &Context<'_>) -> Result<Cow<'c, Value>, RenderError> {
    if !ctx.flavor().is_strict() {
        return Ok(Cow::Owned(Value::Nil));
    }

    let available = ctx.variable_names();
    let suggestion = root.and_then(|root| best_match(root, available.iter().map(String::as_str)));
    tracing::debug!(variable = %name, "Undefined variable in strict template");
    Err(RenderError::UndefinedVariable {
        name,
        suggestion,
        available: available.into_iter().take(MAX_LISTED_VARIABLES).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Flavor, ProtectionSettings};
    use crate::context::Object;
    use crate::parser::Markup;
    use crate::registry::Registry;
    use serde_json::json;

    fn data() -> Object {
        match Value::from(json!({
            "user": {"name": "Ada", "tags": ["admin", "dev"]},
            "items": [1, 2, 3],
            "n": 3,
            "label": "hello world"
        })) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn eval(source: &str, flavor: Flavor) -> Result<Value, RenderError> {
        let registry = Registry::standard();
        let ctx = Context::new(data(), flavor, &registry, &ProtectionSettings::default());
        let expr = Markup::new(source, source, 0, flavor).filtered().unwrap();
        evaluate_filtered(&expr, &ctx)
    }

    fn liquid(source: &str) -> Value {
        eval(source, Flavor::Liquid).unwrap()
    }

    #[test]
    fn test_paths_and_pseudo_properties() {
        assert_eq!(liquid("user.name"), Value::from("Ada"));
        assert_eq!(liquid("user.tags[1]"), Value::from("dev"));
        assert_eq!(liquid("user['tags'].first"), Value::from("admin"));
        assert_eq!(liquid("items.last"), Value::Int(3));
        assert_eq!(liquid("items[-1]"), Value::Int(3));
        assert_eq!(liquid("items.size"), Value::Int(3));
        assert_eq!(liquid("label.size"), Value::Int(11));
        assert_eq!(liquid("items[n]"), Value::Nil);
    }

    #[test]
    fn test_undefined_policy() {
        assert_eq!(liquid("missing.deep"), Value::Nil);
        assert_eq!(liquid("user.missing"), Value::Nil);

        match eval("usr.name", Flavor::Strict).unwrap_err() {
            RenderError::UndefinedVariable {
                name,
                suggestion,
                available,
            } => {
                assert_eq!(name, "usr");
                assert_eq!(suggestion.as_deref(), Some("user"));
                assert!(available.contains(&"items".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = eval("user.missing", Flavor::Strict).unwrap_err();
        assert!(matches!(err, RenderError::UndefinedVariable { ref name, .. } if name == "user.missing"));
    }

    #[test]
    fn test_conditions() {
        assert_eq!(liquid("n > 2 and user.tags contains 'dev'"), Value::Bool(true));
        assert_eq!(liquid("false or n == 3.0"), Value::Bool(true));
        assert_eq!(liquid("label contains 'world'"), Value::Bool(true));
        assert_eq!(liquid("(1..5) contains 5"), Value::Bool(true));
        assert_eq!(liquid("items == empty"), Value::Bool(false));
    }

    #[test]
    fn test_logic_groups_right_to_left() {
        // false and (true or true)
        assert_eq!(liquid("false and true or true"), Value::Bool(false));
        // true or (false and false)
        assert_eq!(liquid("true or false and false"), Value::Bool(true));
        assert_eq!(liquid("n == 3 and missing or label"), Value::Bool(true));
    }

    #[test]
    fn test_long_logic_chain() {
        let source = format!("{}n == 3", "n > 0 and ".repeat(50_000));
        assert_eq!(liquid(&source), Value::Bool(true));
        let source = format!("{}true", "false or ".repeat(50_000));
        assert_eq!(liquid(&source), Value::Bool(true));
    }

    #[test]
    fn test_mismatched_ordering_depends_on_flavor() {
        assert_eq!(liquid("n < 'a'"), Value::Bool(false));
        assert!(matches!(eval("n < 'a'", Flavor::Strict), Err(RenderError::TypeMismatch { .. })));
    }

    #[test]
    fn test_filters_run_in_order() {
        assert_eq!(liquid("label | upcase | split: ' ' | first"), Value::from("HELLO"));
    }

    #[test]
    fn test_unknown_filter_suggests() {
        match eval("label | upcse", Flavor::Liquid).unwrap_err() {
            RenderError::UnknownFilter {
                name,
                suggestion,
            } => {
                assert_eq!(name, "upcse");
                assert_eq!(suggestion.as_deref(), Some("upcase"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
