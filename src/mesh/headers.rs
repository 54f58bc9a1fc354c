use crate::http::Headers;

/// Looks up `name` ignoring case and returns its value upper-cased.
///
/// `Headers` keeps insertion order, so with duplicate names the first one
/// received wins.
pub fn get_header_value(headers: &Headers, name: &str) -> Option<String> {
    headers.get(name).map(str::to_uppercase)
}
