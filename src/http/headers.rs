//! HTTP header map with case-insensitive name lookup.
//!
//! Header names keep the casing they arrived with; lookups ignore it. Entries
//! are kept in arrival order, so "first match" is always well defined.

use serde_json::{Map, Value};

/// A case-insensitive, order-preserving HTTP header map.
///
/// # Examples
///
/// ```
/// use commerce_ext::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("AC-Policy-Market", "de");
/// headers.insert("Content-Type", "application/json");
///
/// assert_eq!(headers.get("ac-policy-market"), Some("de"));
/// assert!(headers.contains("CONTENT-TYPE"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with pre-allocated capacity for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry. Multiple values for the same name are preserved.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the first value for the given header name (case-insensitive), or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the map contains at least one entry with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Returns the total number of header entries (not unique names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no header entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Lower-cases every name into a JSON object, the shape web actions see
    /// under `__ow_headers`. When a name repeats, the first value is kept.
    pub fn to_lowercase_map(&self) -> Map<String, Value> {
        let mut map = Map::with_capacity(self.inner.len());
        for (name, value) in &self.inner {
            map.entry(name.to_ascii_lowercase())
                .or_insert_with(|| Value::String(value.clone()));
        }
        map
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
