//! The standard filters.
//!
//! Every filter is a plain function registered by name. Arithmetic filters
//! coerce numeric strings and `nil` in Liquid templates (anything that does
//! not parse counts as `0`) and reject non-numbers in strict ones.
//!
//! Integer arithmetic follows the reference library: `divided_by` floors and
//! `modulo` takes the sign of the divisor. Operations that overflow `i64`
//! fall back to floats.

use std::cmp::Ordering;
use std::fmt::Write;
use std::sync::LazyLock;

use anyhow::{Result, anyhow, bail};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::context::{Context, Value, range_len};
use crate::core::RenderError;

use super::{FilterArgs, Registry};

/// Add the standard filters to `registry`.
pub(super) fn register(registry: Registry) -> Registry {
    registry
        .with_filter("abs", abs)
        .with_filter("append", append)
        .with_filter("at_least", at_least)
        .with_filter("at_most", at_most)
        .with_filter("capitalize", capitalize)
        .with_filter("ceil", ceil)
        .with_filter("compact", compact)
        .with_filter("concat", concat)
        .with_filter("date", date)
        .with_filter("default", default)
        .with_filter("divided_by", divided_by)
        .with_filter("downcase", downcase)
        .with_filter("escape", escape)
        .with_filter("escape_once", escape_once)
        .with_filter("first", first)
        .with_filter("floor", floor)
        .with_filter("join", join)
        .with_filter("last", last)
        .with_filter("lstrip", lstrip)
        .with_filter("map", map)
        .with_filter("minus", minus)
        .with_filter("modulo", modulo)
        .with_filter("newline_to_br", newline_to_br)
        .with_filter("plus", plus)
        .with_filter("prepend", prepend)
        .with_filter("remove", remove)
        .with_filter("remove_first", remove_first)
        .with_filter("replace", replace)
        .with_filter("replace_first", replace_first)
        .with_filter("reverse", reverse)
        .with_filter("round", round)
        .with_filter("rstrip", rstrip)
        .with_filter("size", size)
        .with_filter("slice", slice)
        .with_filter("sort", sort)
        .with_filter("sort_natural", sort_natural)
        .with_filter("split", split)
        .with_filter("strip", strip)
        .with_filter("strip_html", strip_html)
        .with_filter("strip_newlines", strip_newlines)
        .with_filter("times", times)
        .with_filter("truncate", truncate)
        .with_filter("truncatewords", truncatewords)
        .with_filter("uniq", uniq)
        .with_filter("upcase", upcase)
        .with_filter("where", where_)
}

// Numbers

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Int(i) => Value::Int(i),
            Self::Float(f) => Value::Float(f),
        }
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::Int(i));
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Number::Float)
}

/// Interpret `value` as a number according to the template's flavor.
fn number(value: &Value, ctx: &Context<'_>, filter: &str) -> Result<Number> {
    match value {
        Value::Int(i) => Ok(Number::Int(*i)),
        Value::Float(f) => Ok(Number::Float(*f)),
        other if ctx.flavor().is_strict() => {
            bail!("'{filter}' expects a number, got {}", other.type_name())
        }
        Value::Str(s) => Ok(parse_number(s).unwrap_or(Number::Int(0))),
        _ => Ok(Number::Int(0)),
    }
}

fn operand(args: &FilterArgs, index: usize, ctx: &Context<'_>, filter: &str) -> Result<Number> {
    number(args.require(index, filter)?, ctx, filter)
}

fn arithmetic(
    input: &Value,
    args: &FilterArgs,
    ctx: &Context<'_>,
    filter: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let left = number(input, ctx, filter)?;
    let right = operand(args, 0, ctx, filter)?;
    let result = match (left, right) {
        (Number::Int(a), Number::Int(b)) => {
            int_op(a, b).map_or_else(|| Value::Float(float_op(a as f64, b as f64)), Value::Int)
        }
        _ => Value::Float(float_op(left.as_f64(), right.as_f64())),
    };
    Ok(result)
}

fn plus(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    arithmetic(input, args, ctx, "plus", i64::checked_add, |a, b| a + b)
}

fn minus(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    arithmetic(input, args, ctx, "minus", i64::checked_sub, |a, b| a - b)
}

fn times(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    arithmetic(input, args, ctx, "times", i64::checked_mul, |a, b| a * b)
}

fn ensure_nonzero(args: &FilterArgs, ctx: &Context<'_>, filter: &str) -> Result<()> {
    if operand(args, 0, ctx, filter)?.as_f64() == 0.0 {
        bail!("divided by 0");
    }
    Ok(())
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) { quotient.checked_sub(1) } else { Some(quotient) }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && (remainder < 0) != (b < 0) { Some(remainder + b) } else { Some(remainder) }
}

fn divided_by(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    ensure_nonzero(args, ctx, "divided_by")?;
    arithmetic(input, args, ctx, "divided_by", floor_div, |a, b| a / b)
}

fn modulo(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    ensure_nonzero(args, ctx, "modulo")?;
    arithmetic(input, args, ctx, "modulo", floor_mod, |a, b| a - b * (a / b).floor())
}

fn abs(input: &Value, _args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    Ok(match number(input, ctx, "abs")? {
        Number::Int(i) => i.checked_abs().map_or(Value::Float((i as f64).abs()), Value::Int),
        Number::Float(f) => Value::Float(f.abs()),
    })
}

/// Convert a float result to an integer value, saturating at the `i64` range.
fn float_to_int(f: f64) -> Value {
    Value::Int(f as i64)
}

fn ceil(input: &Value, _args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    Ok(match number(input, ctx, "ceil")? {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => float_to_int(f.ceil()),
    })
}

fn floor(input: &Value, _args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    Ok(match number(input, ctx, "floor")? {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => float_to_int(f.floor()),
    })
}

fn round(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let value = number(input, ctx, "round")?;
    let digits = match args.get(0) {
        Some(digits) => match number(digits, ctx, "round")? {
            Number::Int(i) => i,
            Number::Float(f) => f as i64,
        },
        None => 0,
    };

    Ok(match value {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) if digits <= 0 => float_to_int(f.round()),
        Number::Float(f) => {
            let scale = 10f64.powi(i32::try_from(digits.min(15)).unwrap_or(15));
            Value::Float((f * scale).round() / scale)
        }
    })
}

fn at_least(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let value = number(input, ctx, "at_least")?;
    let bound = operand(args, 0, ctx, "at_least")?;
    let result = if value.as_f64() < bound.as_f64() { bound } else { value };
    Ok(result.into_value())
}

fn at_most(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let value = number(input, ctx, "at_most")?;
    let bound = operand(args, 0, ctx, "at_most")?;
    let result = if value.as_f64() > bound.as_f64() { bound } else { value };
    Ok(result.into_value())
}

// Strings

fn text_arg(args: &FilterArgs, index: usize, filter: &str) -> Result<String> {
    Ok(args.require(index, filter)?.to_text().into_owned())
}

fn append(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let suffix = text_arg(args, 0, "append")?;
    Ok(Value::Str(format!("{}{suffix}", input.to_text())))
}

fn prepend(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let prefix = text_arg(args, 0, "prepend")?;
    Ok(Value::Str(format!("{prefix}{}", input.to_text())))
}

fn capitalize(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let text = input.to_text();
    let mut chars = text.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    Ok(Value::Str(capitalized))
}

fn downcase(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::Str(input.to_text().to_lowercase()))
}

fn upcase(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::Str(input.to_text().to_uppercase()))
}

fn strip(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::from(input.to_text().trim()))
}

fn lstrip(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::from(input.to_text().trim_start()))
}

fn rstrip(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::from(input.to_text().trim_end()))
}

fn strip_newlines(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::Str(input.to_text().replace(['\r', '\n'], "")))
}

fn newline_to_br(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::Str(input.to_text().replace("\r\n", "\n").replace('\n', "<br />\n")))
}

fn remove(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let needle = text_arg(args, 0, "remove")?;
    Ok(Value::Str(input.to_text().replace(&needle, "")))
}

fn remove_first(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let needle = text_arg(args, 0, "remove_first")?;
    Ok(Value::Str(input.to_text().replacen(&needle, "", 1)))
}

fn replace(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let needle = text_arg(args, 0, "replace")?;
    let replacement = args.get(1).map(|v| v.to_text().into_owned()).unwrap_or_default();
    Ok(Value::Str(input.to_text().replace(&needle, &replacement)))
}

fn replace_first(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let needle = text_arg(args, 0, "replace_first")?;
    let replacement = args.get(1).map(|v| v.to_text().into_owned()).unwrap_or_default();
    Ok(Value::Str(input.to_text().replacen(&needle, &replacement, 1)))
}

fn split(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let text = input.to_text();
    let pattern = text_arg(args, 0, "split")?;

    let mut parts: Vec<Value> = if pattern == " " {
        text.split_whitespace().map(Value::from).collect()
    } else if pattern.is_empty() {
        text.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        text.split(pattern.as_str()).map(Value::from).collect()
    };
    while parts.last().is_some_and(Value::is_empty_value) {
        parts.pop();
    }
    Ok(Value::Array(parts))
}

fn truncate(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let text = input.to_text();
    let length = match args.get(0) {
        Some(length) => count(length, ctx, "truncate")?,
        None => 50,
    };
    let ellipsis = args.get(1).map_or_else(|| "...".to_string(), |v| v.to_text().into_owned());

    if text.chars().count() <= length {
        return Ok(Value::Str(text.into_owned()));
    }
    let keep = length.saturating_sub(ellipsis.chars().count());
    let truncated: String = text.chars().take(keep).collect();
    Ok(Value::Str(truncated + &ellipsis))
}

fn truncatewords(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let text = input.to_text();
    let words = match args.get(0) {
        Some(words) => count(words, ctx, "truncatewords")?.max(1),
        None => 15,
    };
    let ellipsis = args.get(1).map_or_else(|| "...".to_string(), |v| v.to_text().into_owned());

    let all: Vec<&str> = text.split_whitespace().collect();
    if all.len() <= words {
        return Ok(Value::Str(text.into_owned()));
    }
    Ok(Value::Str(all[..words].join(" ") + &ellipsis))
}

fn count(value: &Value, ctx: &Context<'_>, filter: &str) -> Result<usize> {
    Ok(match number(value, ctx, filter)? {
        Number::Int(i) => usize::try_from(i.max(0)).unwrap_or(usize::MAX),
        Number::Float(f) => f.max(0.0) as usize,
    })
}

fn escape_char(c: char, out: &mut String) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        c => out.push(c),
    }
}

fn escape(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    if input.is_nil() {
        return Ok(Value::Nil);
    }
    let text = input.to_text();
    let mut out = String::with_capacity(text.len());
    text.chars().for_each(|c| escape_char(c, &mut out));
    Ok(Value::Str(out))
}

/// Length of an entity such as `&amp;` or `&#39;` at the start of `text`.
fn entity_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('&')?;
    let (name_len, numeric) = match body.strip_prefix('#') {
        Some(digits) => (digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len()), true),
        None => (body.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(body.len()), false),
    };
    let offset = 1 + usize::from(numeric);
    (name_len > 0 && text[offset + name_len..].starts_with(';')).then_some(offset + name_len + 1)
}

fn escape_once(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let text = input.to_text();
    let mut out = String::with_capacity(text.len());
    let mut rest: &str = &text;

    while let Some(c) = rest.chars().next() {
        if c == '&'
            && let Some(len) = entity_len(rest)
        {
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }
        escape_char(c, &mut out);
        rest = &rest[c.len_utf8()..];
    }
    Ok(Value::Str(out))
}

static HTML_TAGS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>|<!--.*?-->|<style.*?</style>|<.*?>"));

fn strip_html(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let pattern = HTML_TAGS.as_ref().map_err(|e| anyhow!("invalid HTML pattern: {e}"))?;
    Ok(Value::Str(pattern.replace_all(&input.to_text(), "").into_owned()))
}

fn slice(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let offset = match number(args.require(0, "slice")?, ctx, "slice")? {
        Number::Int(i) => i,
        Number::Float(f) => f as i64,
    };
    let length = match args.get(1) {
        Some(length) => count(length, ctx, "slice")?,
        None => 1,
    };

    let window = |len: usize| -> Option<(usize, usize)> {
        let len_i = i64::try_from(len).ok()?;
        let start = if offset < 0 { len_i + offset } else { offset };
        if start < 0 || start > len_i {
            return None;
        }
        let start = usize::try_from(start).ok()?;
        Some((start, length.min(len - start)))
    };

    Ok(match input {
        Value::Array(items) => match window(items.len()) {
            Some((start, take)) => Value::Array(items[start..start + take].to_vec()),
            None => Value::Array(Vec::new()),
        },
        other => {
            let chars: Vec<char> = other.to_text().chars().collect();
            match window(chars.len()) {
                Some((start, take)) => Value::Str(chars[start..start + take].iter().collect()),
                None => Value::Str(String::new()),
            }
        }
    })
}

// Dates

fn date(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let format = match args.get(0) {
        Some(format) => format.to_text().into_owned(),
        None => return Ok(input.clone()),
    };
    if format.is_empty() {
        return Ok(input.clone());
    }

    let Some(moment) = parse_date(input) else {
        if ctx.flavor().is_strict() && !input.is_nil() {
            bail!("cannot interpret {} '{}' as a date", input.type_name(), input.to_text());
        }
        return Ok(input.clone());
    };

    let items: Vec<Item<'_>> = StrftimeItems::new(&format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        bail!("invalid date format '{format}'");
    }

    let mut out = String::new();
    write!(out, "{}", moment.format_with_items(items.iter()))?;
    Ok(Value::Str(out))
}

fn parse_date(value: &Value) -> Option<DateTime<FixedOffset>> {
    let from_timestamp = |seconds: i64| DateTime::from_timestamp(seconds, 0).map(|d| d.fixed_offset());

    match value {
        Value::Int(seconds) => from_timestamp(*seconds),
        Value::Float(seconds) => from_timestamp(*seconds as i64),
        Value::Str(text) => {
            let text = text.trim();
            if matches!(text, "now" | "today") {
                return Some(Local::now().fixed_offset());
            }
            if let Ok(seconds) = text.parse::<i64>() {
                return from_timestamp(seconds);
            }
            DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_rfc2822(text))
                .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z"))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
                        .iter()
                        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
                        .map(|naive| naive.and_utc().fixed_offset())
                })
                .or_else(|| {
                    ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
                        .iter()
                        .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
                        .and_then(|day| day.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc().fixed_offset())
                })
        }
        _ => None,
    }
}

// Collections

/// Elements of an iterable input; ranges are checked against the
/// iteration limit before they are expanded.
fn elements(input: &Value, ctx: &Context<'_>) -> Result<Vec<Value>> {
    match input {
        Value::Array(items) => Ok(items.clone()),
        Value::Range(start, end) => {
            ctx.guard().check_iteration(range_len(*start, *end))?;
            Ok(input.to_vec())
        }
        Value::Nil => Ok(Vec::new()),
        other => Ok(vec![other.clone()]),
    }
}

fn property<'v>(item: &'v Value, name: Option<&str>) -> Option<&'v Value> {
    match name {
        Some(name) => item.get(name),
        None => Some(item),
    }
}

fn property_arg(args: &FilterArgs) -> Option<String> {
    args.get(0).map(|v| v.to_text().into_owned())
}

fn first(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(match input {
        Value::Array(_) | Value::Range(..) => input.get_index(0).map(|v| v.into_owned()).unwrap_or_default(),
        _ => Value::Nil,
    })
}

fn last(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(match input {
        Value::Array(_) | Value::Range(..) => input.get_index(-1).map(|v| v.into_owned()).unwrap_or_default(),
        _ => Value::Nil,
    })
}

fn join(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let separator = args.get(0).map_or_else(|| " ".to_string(), |v| v.to_text().into_owned());
    let joined = elements(input, ctx)?
        .iter()
        .map(|item| item.to_text().into_owned())
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::Str(joined))
}

fn reverse(input: &Value, _args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let mut items = elements(input, ctx)?;
    items.reverse();
    Ok(Value::Array(items))
}

fn size(input: &Value, _args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    Ok(Value::from(input.size().unwrap_or(0)))
}

fn sort(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let key = property_arg(args);
    let mut items = elements(input, ctx)?;
    let strict = ctx.flavor().is_strict();
    let mut incomparable = false;

    items.sort_by(|a, b| {
        let (a, b) = (property(a, key.as_deref()), property(b, key.as_deref()));
        match (a, b) {
            (Some(a), Some(b)) if !a.is_nil() && !b.is_nil() => a.liquid_cmp(b).unwrap_or_else(|| {
                incomparable = true;
                Ordering::Equal
            }),
            (Some(a), _) if !a.is_nil() => Ordering::Less,
            (_, Some(b)) if !b.is_nil() => Ordering::Greater,
            _ => Ordering::Equal,
        }
    });

    if strict && incomparable {
        bail!("cannot sort values of different types");
    }
    Ok(Value::Array(items))
}

fn sort_natural(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let key = property_arg(args);
    let mut items = elements(input, ctx)?;
    items.sort_by_cached_key(|item| {
        property(item, key.as_deref()).map(|v| v.to_text().to_lowercase())
    });
    Ok(Value::Array(items))
}

fn uniq(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let key = property_arg(args);
    let mut seen: Vec<Value> = Vec::new();
    let mut unique = Vec::new();
    for item in elements(input, ctx)? {
        let identity = property(&item, key.as_deref()).cloned().unwrap_or_default();
        if !seen.iter().any(|s| s.liquid_eq(&identity)) {
            seen.push(identity);
            unique.push(item);
        }
    }
    Ok(Value::Array(unique))
}

fn compact(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let key = property_arg(args);
    let items = elements(input, ctx)?
        .into_iter()
        .filter(|item| property(item, key.as_deref()).is_some_and(|v| !v.is_nil()))
        .collect();
    Ok(Value::Array(items))
}

fn concat(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let Value::Array(extra) = args.require(0, "concat")? else {
        bail!("'concat' expects an array argument");
    };
    let mut items = elements(input, ctx)?;
    items.extend(extra.iter().cloned());
    Ok(Value::Array(items))
}

fn map(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let key = text_arg(args, 0, "map")?;
    let items = elements(input, ctx)?
        .iter()
        .map(|item| item.get(&key).cloned().unwrap_or_default())
        .collect();
    Ok(Value::Array(items))
}

fn where_(input: &Value, args: &FilterArgs, ctx: &Context<'_>) -> Result<Value> {
    let key = text_arg(args, 0, "where")?;
    let target = args.get(1);
    let items = elements(input, ctx)?
        .into_iter()
        .filter(|item| {
            let value = item.get(&key);
            match (value, target) {
                (Some(value), Some(target)) => value.liquid_eq(target),
                (Some(value), None) => value.is_truthy(),
                (None, _) => false,
            }
        })
        .collect();
    Ok(Value::Array(items))
}

fn default(input: &Value, args: &FilterArgs, _ctx: &Context<'_>) -> Result<Value> {
    let allow_false = args.keyword("allow_false").is_some_and(Value::is_truthy);
    let use_fallback = match input {
        Value::Nil | Value::Empty | Value::Blank => true,
        Value::Bool(false) => !allow_false,
        Value::Str(_) | Value::Array(_) | Value::Object(_) => input.is_empty_value(),
        _ => false,
    };
    if use_fallback {
        Ok(args.get(0).cloned().unwrap_or_default())
    } else {
        Ok(input.clone())
    }
}

/// Re-raise limit errors from inside a filter as the render's own error.
pub(crate) fn unwrap_limit(error: anyhow::Error) -> std::result::Result<RenderError, anyhow::Error> {
    match error.downcast::<RenderError>() {
        Ok(inner) if inner.is_limit() => Ok(inner),
        Ok(inner) => Err(inner.into()),
        Err(error) => Err(error),
    }
}
