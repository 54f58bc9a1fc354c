//! Helpers shared by every action.

use serde_json::{Map, Value, json};

use super::ActionResponse;
use super::params::{ActionParams, OW_HEADERS, lookup_path};
use crate::logging::ActionLogger;

/// Builds an error response and logs `"<status>: <message>"` at info level.
pub fn error_response(status_code: u16, message: &str, logger: &ActionLogger) -> ActionResponse {
    logger.info(&format!("{status_code}: {message}"));
    ActionResponse::error(status_code, json!({ "error": message }))
}

/// Params as a JSON string with the `authorization` header masked.
pub fn string_parameters(params: &ActionParams) -> String {
    let mut map = params.as_map().clone();
    let mut headers = params.headers().cloned().unwrap_or_default();
    if headers.contains_key("authorization") {
        headers.insert("authorization".to_owned(), json!("<hidden>"));
    }
    map.insert(OW_HEADERS.to_owned(), Value::Object(headers));
    Value::Object(map).to_string()
}

/// Returns a client-facing message naming every missing input, or `None`.
///
/// Parameters may be dotted paths (`info.qty`). A value counts as missing
/// when it is absent or an empty string. Header names are matched
/// lower-cased against `__ow_headers`.
pub fn check_missing_request_inputs(
    params: &ActionParams,
    required_params: &[&str],
    required_headers: &[&str],
) -> Option<String> {
    let empty = Map::new();
    let headers = params.headers().unwrap_or(&empty);
    let required_headers: Vec<String> = required_headers
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();

    let missing_headers = missing_keys(headers, required_headers.iter().map(String::as_str));
    let missing_params = missing_keys(params.as_map(), required_params.iter().copied());

    let mut parts = Vec::with_capacity(2);
    if !missing_headers.is_empty() {
        parts.push(format!("missing header(s) '{}'", missing_headers.join(",")));
    }
    if !missing_params.is_empty() {
        parts.push(format!("missing parameter(s) '{}'", missing_params.join(",")));
    }
    (!parts.is_empty()).then(|| parts.join(" and "))
}

fn missing_keys<'a>(
    root: &Map<String, Value>,
    required: impl Iterator<Item = &'a str>,
) -> Vec<&'a str> {
    required
        .filter(|key| match lookup_path(root, key) {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .collect()
}
