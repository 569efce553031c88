//! The runtime value model.
//!
//! Render data is converted into [`Value`] trees, either from
//! [`serde_json::Value`] or from any [`serde::Serialize`] type through
//! [`Value::from_serialize`].

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

/// Mapping type used for objects and scope frames.
pub type Object = IndexMap<String, Value>;

/// A runtime value in a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or undefined value; renders as empty text
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    /// Mapping with insertion order preserved
    Object(Object),
    /// Inclusive integer range produced by `(a..b)`
    Range(i64, i64),
    /// The `empty` keyword, only meaningful in comparisons
    Empty,
    /// The `blank` keyword, only meaningful in comparisons
    Blank,
}

impl Value {
    /// Convert any serializable host value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use liqrs::Value;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Product {
    ///     title: String,
    ///     price: f64,
    /// }
    ///
    /// let value = Value::from_serialize(&Product { title: "Mug".into(), price: 9.5 }).unwrap();
    /// assert_eq!(value.get("title"), Some(&Value::from("Mug")));
    /// ```
    pub fn from_serialize<T: serde::Serialize + ?Sized>(data: &T) -> serde_json::Result<Self> {
        serde_json::to_value(data).map(Self::from)
    }

    /// Build an object from key/value pairs.
    pub fn object<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Liquid truthiness: only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Range(..) => "range",
            Self::Empty => "empty",
            Self::Blank => "blank",
        }
    }

    /// Value of an object key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Array element; negative indices count from the end.
    pub fn get_index(&self, index: i64) -> Option<Cow<'_, Value>> {
        match self {
            Self::Array(items) => {
                let len = items.len() as i64;
                let index = if index < 0 { len + index } else { index };
                usize::try_from(index).ok().and_then(|i| items.get(i)).map(Cow::Borrowed)
            }
            Self::Range(start, end) => {
                let len = range_len(*start, *end) as i64;
                let index = if index < 0 { len + index } else { index };
                (0..len).contains(&index).then(|| Cow::Owned(Self::Int(start + index)))
            }
            _ => None,
        }
    }

    /// Number of elements, characters or entries; `None` for scalars.
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(s.chars().count()),
            Self::Array(items) => Some(items.len()),
            Self::Object(map) => Some(map.len()),
            Self::Range(start, end) => Some(range_len(*start, *end)),
            _ => None,
        }
    }

    /// Whether the value equals the `empty` keyword.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Self::Str(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
            Self::Range(start, end) => start > end,
            Self::Empty => true,
            _ => false,
        }
    }

    /// Whether the value equals the `blank` keyword.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Nil | Self::Bool(false) | Self::Blank => true,
            Self::Str(s) => s.trim().is_empty(),
            other => other.is_empty_value(),
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value's textual form as it appears in output.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Str(s) => Cow::Borrowed(s),
            Self::Nil | Self::Empty | Self::Blank => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Flatten iterable values into a list of elements.
    pub fn to_vec(&self) -> Vec<Value> {
        match self {
            Self::Array(items) => items.clone(),
            Self::Range(start, end) => (*start..=*end).map(Self::Int).collect(),
            Self::Object(map) => map
                .iter()
                .map(|(k, v)| Self::Array(vec![Self::Str(k.clone()), v.clone()]))
                .collect(),
            Self::Nil => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Liquid equality: numbers compare across int/float and the
    /// `empty`/`blank` keywords compare by emptiness.
    pub fn liquid_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Empty, v) | (v, Self::Empty) => v.is_empty_value(),
            (Self::Blank, v) | (v, Self::Blank) => v.is_blank(),
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Range(a, b), Self::Array(items)) | (Self::Array(items), Self::Range(a, b)) => {
                items.len() == range_len(*a, *b)
                    && items.iter().zip(*a..=*b).all(|(v, i)| v.liquid_eq(&Self::Int(i)))
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.liquid_eq(y))
            }
            (a, b) => a == b,
        }
    }

    /// Ordering for `<`, `>`, `<=`, `>=`; `None` when the types do not compare.
    pub fn liquid_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

/// Number of integers in the inclusive range `start..=end`.
pub(crate) fn range_len(start: i64, end: i64) -> usize {
    if end < start {
        0
    } else {
        usize::try_from(end.abs_diff(start)).map_or(usize::MAX, |d| d.saturating_add(1))
    }
}

/// Format a float the way the reference implementation prints it.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil | Self::Empty | Self::Blank => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::Str(s) => f.write_str(s),
            Self::Array(items) => items.iter().try_for_each(|item| write!(f, "{item}")),
            Self::Range(start, end) => write!(f, "{start}..{end}"),
            Self::Object(map) => {
                let json = serde_json::Value::from(Self::Object(map.clone()));
                write!(f, "{json}")
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Nil,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Nil | Value::Empty | Value::Blank => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number),
            Value::Str(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Range(start, end) => Self::String(format!("{start}..{end}")),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Self::Float(i as f64), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Self::Object(map)
    }
}
