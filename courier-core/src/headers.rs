//! Request and response header helpers.
//!
//! Request headers are held in [`Headers`], an insertion-ordered mapping whose
//! entries are either plain values, value lists, or nested groups. Groups carry
//! the per-method sections (`common`, `get`, `post`, ...) that
//! [`flatten_headers`] folds into one flat mapping right before dispatch.
//!
//! Response headers use the same type, flat and keyed by lower-cased name.

use http::Method;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::HeaderError;

/// Canonical spelling of the content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Content type asserted for JSON object bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Group keys removed by [`flatten_headers`].
pub const GROUP_KEYS: [&str; 8] = [
    "common", "get", "post", "put", "patch", "delete", "head", "options",
];

/// A single entry of a [`Headers`] mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderEntry {
    /// A single header value.
    Value(String),
    /// Several values for the same header.
    List(Vec<String>),
    /// A nested group, e.g. the `post` section of the defaults.
    Group(Headers),
}

impl HeaderEntry {
    /// Returns the nested group, if this entry is one.
    pub fn as_group(&self) -> Option<&Headers> {
        match self {
            HeaderEntry::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Returns the single value, if this entry is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderEntry::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for HeaderEntry {
    fn from(value: &str) -> Self {
        HeaderEntry::Value(value.to_string())
    }
}

impl From<String> for HeaderEntry {
    fn from(value: String) -> Self {
        HeaderEntry::Value(value)
    }
}

impl From<Vec<String>> for HeaderEntry {
    fn from(values: Vec<String>) -> Self {
        HeaderEntry::List(values)
    }
}

impl From<Vec<&str>> for HeaderEntry {
    fn from(values: Vec<&str>) -> Self {
        HeaderEntry::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Headers> for HeaderEntry {
    fn from(group: Headers) -> Self {
        HeaderEntry::Group(group)
    }
}

/// Insertion-ordered request header mapping.
///
/// Keys are stored exactly as given. Lookups through [`Headers::get`] are
/// exact; [`Headers::get_ignore_case`] and [`normalize_header_name`] provide
/// the case-insensitive view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderEntry)>,
}

impl Headers {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace an entry, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, entry: impl Into<HeaderEntry>) {
        let name = name.into();
        let entry = entry.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((name, entry)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, entry: impl Into<HeaderEntry>) -> Self {
        self.insert(name, entry);
        self
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&HeaderEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Case-insensitive lookup; the first matching entry wins.
    pub fn get_ignore_case(&self, name: &str) -> Option<&HeaderEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, entry)| entry)
    }

    /// Whether an entry with exactly this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove an entry by exact name.
    pub fn remove(&mut self, name: &str) -> Option<HeaderEntry> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    /// The nested group stored under `name`, if any.
    pub fn group(&self, name: &str) -> Option<&Headers> {
        self.get(name).and_then(HeaderEntry::as_group)
    }

    /// Mutable access to the group under `name`, creating it when missing.
    ///
    /// A non-group entry under the same name is replaced by an empty group.
    pub fn group_mut(&mut self, name: &str) -> &mut Headers {
        if !matches!(self.get(name), Some(HeaderEntry::Group(_))) {
            self.insert(name, Headers::new());
        }
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, HeaderEntry::Group(group))) => group,
            _ => unreachable!("group inserted above"),
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Recursively merge `sources` left to right into a fresh mapping.
    ///
    /// Groups present on both sides are merged; any other entry from a later
    /// source replaces the earlier one. Sources are never modified.
    pub fn deep_merge(sources: &[&Headers]) -> Headers {
        let mut result = Headers::new();
        for source in sources {
            for (name, entry) in source.iter() {
                let merged = match (entry, result.get(name)) {
                    (HeaderEntry::Group(incoming), Some(HeaderEntry::Group(existing))) => {
                        HeaderEntry::Group(Headers::deep_merge(&[existing, incoming]))
                    }
                    _ => entry.clone(),
                };
                result.insert(name, merged);
            }
        }
        result
    }

    /// Convert the flat entries into an [`http::HeaderMap`].
    ///
    /// Lists are joined with `", "`. Group entries have no wire form and are
    /// skipped.
    pub fn to_header_map(&self) -> Result<HeaderMap, HeaderError> {
        let mut map = HeaderMap::with_capacity(self.len());
        for (name, entry) in self.iter() {
            let value = match entry {
                HeaderEntry::Value(value) => value.clone(),
                HeaderEntry::List(values) => values.join(", "),
                HeaderEntry::Group(_) => continue,
            };
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HeaderError::InvalidName(name.to_string()))?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|_| HeaderError::InvalidValue {
                    name: name.to_string(),
                    value: value.clone(),
                })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<HeaderEntry>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, entry) in iter {
            headers.insert(name, entry);
        }
        headers
    }
}

/// Rename every differently-cased spelling of `canonical` to `canonical`.
pub fn normalize_header_name(headers: &mut Headers, canonical: &str) {
    let aliases: Vec<String> = headers
        .iter()
        .filter(|(name, _)| *name != canonical && name.eq_ignore_ascii_case(canonical))
        .map(|(name, _)| name.to_string())
        .collect();
    for alias in aliases {
        if let Some(entry) = headers.remove(&alias) {
            headers.insert(canonical, entry);
        }
    }
}

/// Normalize the content type header and default it for JSON object bodies.
pub fn process_headers(headers: &mut Headers, data: &Value) {
    normalize_header_name(headers, CONTENT_TYPE);
    if data.is_object() && !headers.contains(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, JSON_CONTENT_TYPE);
    }
}

/// Fold `common`, the method's own group and the flat entries into one
/// mapping (later wins), then drop every group key.
pub fn flatten_headers(headers: &Headers, method: &Method) -> Headers {
    let empty = Headers::new();
    let method_key = method.as_str().to_ascii_lowercase();
    let common = headers.group("common").unwrap_or(&empty);
    let for_method = headers.group(&method_key).unwrap_or(&empty);

    let mut flat = Headers::deep_merge(&[common, for_method, headers]);
    for key in GROUP_KEYS {
        flat.remove(key);
    }
    flat
}

impl From<&HeaderMap> for Headers {
    /// Collect wire headers under their lower-cased names, joining repeated
    /// values with `", "`.
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Headers::new();
        for name in map.keys() {
            let joined = map
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            headers.insert(name.as_str(), joined);
        }
        headers
    }
}

/// Parse a raw `name: value` header block separated by CRLF.
///
/// Lines without a name are skipped. Only the first colon separates name and
/// value, so values such as dates keep their own colons.
pub fn parse_headers(raw: &str) -> Headers {
    let mut parsed = Headers::new();
    for line in raw.split("\r\n") {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.trim()),
            None => (line, ""),
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        parsed.insert(name, value);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults_like() -> Headers {
        Headers::new()
            .with(
                "common",
                Headers::new().with("Accept", "application/json, text/plain, */*"),
            )
            .with(
                "post",
                Headers::new().with(CONTENT_TYPE, "application/x-www-form-urlencoded"),
            )
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut headers = Headers::new().with("a", "1").with("b", "2");
        headers.insert("a", "3");
        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(headers.get("a").and_then(HeaderEntry::as_str), Some("3"));
    }

    #[test]
    fn test_normalize_header_name() {
        let mut headers = Headers::new().with("content-type", "text/plain").with("x-a", "1");
        normalize_header_name(&mut headers, CONTENT_TYPE);
        assert!(headers.get("content-type").is_none());
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(HeaderEntry::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn test_process_headers_defaults_json_content_type() {
        let mut headers = Headers::new();
        process_headers(&mut headers, &json!({"a": 1}));
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(HeaderEntry::as_str),
            Some(JSON_CONTENT_TYPE)
        );
    }

    #[test]
    fn test_process_headers_keeps_explicit_content_type() {
        let mut headers = Headers::new().with("CONTENT-TYPE", "text/plain");
        process_headers(&mut headers, &json!({"a": 1}));
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(HeaderEntry::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn test_process_headers_ignores_non_objects() {
        let mut headers = Headers::new();
        process_headers(&mut headers, &json!("a=1"));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_deep_merge_recurses_into_groups() {
        let base = defaults_like();
        let over = Headers::new()
            .with("common", Headers::new().with("X-Trace", "1"))
            .with("X-Flat", "yes");

        let merged = Headers::deep_merge(&[&base, &over]);
        let common = merged.group("common").unwrap();
        assert_eq!(common.len(), 2);
        assert!(common.contains("Accept"));
        assert!(common.contains("X-Trace"));
        assert!(merged.group("post").is_some());
        assert!(merged.contains("X-Flat"));
    }

    #[test]
    fn test_deep_merge_override_leaf_wins() {
        let base = Headers::new().with("common", Headers::new().with("Accept", "a"));
        let over = Headers::new().with("common", Headers::new().with("Accept", "b"));
        let merged = Headers::deep_merge(&[&base, &over]);
        assert_eq!(
            merged.group("common").unwrap().get("Accept"),
            Some(&HeaderEntry::Value("b".into()))
        );
        // inputs untouched
        assert_eq!(
            base.group("common").unwrap().get("Accept"),
            Some(&HeaderEntry::Value("a".into()))
        );
    }

    #[test]
    fn test_flatten_headers_precedence() {
        let headers = defaults_like()
            .with("get", Headers::new().with("X-Method", "get"))
            .with("Accept", "text/html");

        let flat = flatten_headers(&headers, &Method::POST);
        assert_eq!(flat.get("Accept").and_then(HeaderEntry::as_str), Some("text/html"));
        assert_eq!(
            flat.get(CONTENT_TYPE).and_then(HeaderEntry::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert!(!flat.contains("X-Method"));
        for key in GROUP_KEYS {
            assert!(!flat.contains(key), "{key} should be removed");
        }
    }

    #[test]
    fn test_flatten_headers_get_ignores_post_group() {
        let flat = flatten_headers(&defaults_like(), &Method::GET);
        assert!(flat.contains("Accept"));
        assert!(!flat.contains(CONTENT_TYPE));
    }

    #[test]
    fn test_to_header_map_joins_lists() {
        let headers = Headers::new()
            .with("x-list", vec!["a", "b"])
            .with("x-one", "1")
            .with("common", Headers::new().with("ignored", "1"));
        let map = headers.to_header_map().unwrap();
        assert_eq!(map.get("x-list").unwrap(), "a, b");
        assert_eq!(map.get("x-one").unwrap(), "1");
        assert!(map.get("common").is_none());
    }

    #[test]
    fn test_to_header_map_rejects_bad_name() {
        let headers = Headers::new().with("bad name", "1");
        assert_eq!(
            headers.to_header_map(),
            Err(HeaderError::InvalidName("bad name".into()))
        );
    }

    #[test]
    fn test_parse_headers() {
        let raw = "Date: Tue, 21 May 2019 09:23:44 GMT\r\n\
                   Content-Type: application/json; charset=utf-8\r\n\
                   Connection: keep-alive\r\n\
                   : orphan\r\n";
        let parsed = parse_headers(raw);
        let value = |name: &str| parsed.get(name).and_then(HeaderEntry::as_str);
        assert_eq!(value("date"), Some("Tue, 21 May 2019 09:23:44 GMT"));
        assert_eq!(value("content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(value("connection"), Some("keep-alive"));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_headers_from_header_map() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("X-Request-Id", HeaderValue::from_static("abc"));

        let headers = Headers::from(&map);
        assert_eq!(
            headers.get("set-cookie").and_then(HeaderEntry::as_str),
            Some("a=1, b=2")
        );
        assert_eq!(
            headers.get_ignore_case("X-Request-Id").and_then(HeaderEntry::as_str),
            Some("abc")
        );
    }
}
