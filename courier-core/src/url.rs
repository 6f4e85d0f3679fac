//! Query-string serialization.
//!
//! [`build_url`] appends serialized [`Params`] to a URL. Encoding follows
//! `encodeURIComponent` with a few characters kept readable: `@ : $ , [ ]`
//! stay literal and a space becomes `+`.

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Number, Value};

/// Characters escaped in a query key or value.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'@')
    .remove(b':')
    .remove(b'$')
    .remove(b',')
    .remove(b'[')
    .remove(b']');

/// A single query parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Skipped during serialization.
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Serialized as ISO-8601 with millisecond precision.
    Date(DateTime<Utc>),
    /// Serialized as repeated `key[]=` pairs.
    List(Vec<ParamValue>),
    /// Serialized as JSON text.
    Object(Map<String, Value>),
}

impl ParamValue {
    /// Render a scalar for the query string. `None` means "skip".
    fn render(&self) -> Option<String> {
        match self {
            ParamValue::Null => None,
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Number(n) => Some(n.to_string()),
            ParamValue::String(s) => Some(s.clone()),
            ParamValue::Date(date) => Some(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ParamValue::Object(map) => Some(Value::Object(map.clone()).to_string()),
            ParamValue::List(items) => Some(
                items
                    .iter()
                    .filter_map(ParamValue::render)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(ParamValue::Null, ParamValue::Number)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Date(value)
    }
}

impl From<Map<String, Value>> for ParamValue {
    fn from(value: Map<String, Value>) -> Self {
        ParamValue::Object(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => ParamValue::Number(n),
            Value::String(s) => ParamValue::String(s),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => ParamValue::Object(map),
        }
    }
}

/// Insertion-ordered query parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, keeping its position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a parameter by key.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Percent-encode one query component.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_COMPONENT)
        .map(|chunk| if chunk == "%20" { "+" } else { chunk })
        .collect()
}

/// Serialize parameters into `key=value` pairs joined by `&`.
pub fn serialize_params(params: &Params) -> String {
    let mut parts = Vec::new();
    for (key, value) in params.iter() {
        match value {
            ParamValue::Null => continue,
            ParamValue::List(items) => {
                let key = encode(&format!("{key}[]"));
                for rendered in items.iter().filter_map(ParamValue::render) {
                    parts.push(format!("{key}={}", encode(&rendered)));
                }
            }
            scalar => {
                if let Some(rendered) = scalar.render() {
                    parts.push(format!("{}={}", encode(key), encode(&rendered)));
                }
            }
        }
    }
    parts.join("&")
}

/// Append serialized `params` to `url`.
///
/// When anything is appended, a `#fragment` is dropped first and the pairs
/// follow `?`, or `&` if the URL already carries a query.
pub fn build_url(url: &str, params: Option<&Params>) -> String {
    let Some(params) = params else {
        return url.to_string();
    };
    let serialized = serialize_params(params);
    if serialized.is_empty() {
        return url.to_string();
    }

    let base = match url.find('#') {
        Some(index) => &url[..index],
        None => url,
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{serialized}")
}
