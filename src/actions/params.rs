//! The merged parameter object a web action is invoked with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ActionError;
use crate::http::Request;

pub const OW_HEADERS: &str = "__ow_headers";
pub const OW_METHOD: &str = "__ow_method";
pub const OW_PATH: &str = "__ow_path";

/// Flat JSON object of action inputs.
///
/// From an HTTP request the layers are, lowest priority first: bound
/// defaults, query parameters, JSON body fields. The request itself is
/// described by `__ow_headers` (lower-cased names), `__ow_method` and
/// `__ow_path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParams(Map<String, Value>);

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn from_request(request: &Request, defaults: &Map<String, Value>) -> Result<Self, ActionError> {
        let mut params = defaults.clone();

        for (key, value) in request.query_params() {
            params.insert(key.to_owned(), Value::String(value.to_owned()));
        }

        if !request.body().iter().all(u8::is_ascii_whitespace) {
            match request.json::<Value>().map_err(ActionError::InvalidBody)? {
                Value::Object(body) => params.extend(body),
                _ => return Err(ActionError::BodyNotObject),
            }
        }

        params.insert(
            OW_HEADERS.to_owned(),
            Value::Object(request.headers().to_lowercase_map()),
        );
        params.insert(
            OW_METHOD.to_owned(),
            Value::String(request.method().as_str().to_ascii_lowercase()),
        );
        params.insert(OW_PATH.to_owned(), Value::String(request.path().to_owned()));

        Ok(Self(params))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string parameter.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Follows `a.b.c` through nested objects.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.0, path)
    }

    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.get(OW_HEADERS).and_then(Value::as_object)
    }

    /// Request header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers()?
            .get(&name.to_ascii_lowercase())
            .and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ActionParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub(crate) fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(root.get(first)?, |current, segment| current.get(segment))
}
