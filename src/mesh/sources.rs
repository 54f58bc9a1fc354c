//! Upstream GraphQL sources the resolvers call into.
//!
//! A source is addressed by name (`Commerce`, `CommerceAPI`, `ACOMGQL`,
//! `Announcements`) and exposes one operation: run a single root field with
//! literal arguments and a selection set, returning that field's data.

use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source request failed: {0}")]
    Transport(String),

    #[error("source answered HTTP {status}")]
    Status { status: u16 },

    #[error("source returned errors: {}", .0.join("; "))]
    Graphql(Vec<String>),

    #[error("source response has no data for `{field}`")]
    MissingData { field: String },

    #[error("source response is not valid JSON: {0}")]
    InvalidResponse(String),

    #[error("`{name}` is not a valid GraphQL name")]
    InvalidName { name: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Mutation,
}

impl Operation {
    fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// One root-field call against a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRequest {
    pub operation: Operation,
    pub field: String,
    pub args: Map<String, Value>,
    pub selection_set: String,
}

impl SourceRequest {
    pub fn query(field: impl Into<String>, selection_set: impl Into<String>) -> Self {
        Self::new(Operation::Query, field, selection_set)
    }

    pub fn mutation(field: impl Into<String>, selection_set: impl Into<String>) -> Self {
        Self::new(Operation::Mutation, field, selection_set)
    }

    fn new(
        operation: Operation,
        field: impl Into<String>,
        selection_set: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            field: field.into(),
            args: Map::new(),
            selection_set: selection_set.into(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Copies every entry of `args` if it is an object; anything else is ignored.
    pub fn args_from(mut self, args: &Value) -> Self {
        if let Some(map) = args.as_object() {
            self.args
                .extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self
    }

    /// Renders the call as a GraphQL document with inline literal arguments.
    ///
    /// Argument names and object keys are written bare, so each must match
    /// the GraphQL `Name` grammar or the request is refused.
    pub fn to_document(&self) -> Result<String, SourceError> {
        let mut doc = format!("{} {{ {}", self.operation.keyword(), check_name(&self.field)?);
        if !self.args.is_empty() {
            doc.push('(');
            for (i, (name, value)) in self.args.iter().enumerate() {
                if i > 0 {
                    doc.push_str(", ");
                }
                let _ = write!(doc, "{}: {}", check_name(name)?, graphql_literal(value)?);
            }
            doc.push(')');
        }
        let selection = self.selection_set.trim();
        if !selection.is_empty() {
            doc.push(' ');
            doc.push_str(selection);
        }
        doc.push_str(" }");
        Ok(doc)
    }
}

/// `[_A-Za-z][_0-9A-Za-z]*`
fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn check_name(name: &str) -> Result<&str, SourceError> {
    if is_graphql_name(name) {
        Ok(name)
    } else {
        Err(SourceError::InvalidName {
            name: name.to_owned(),
        })
    }
}

/// Renders a JSON value as a GraphQL input literal.
///
/// Strings keep JSON escaping, which GraphQL string literals accept.
/// Object keys are emitted bare and must be valid GraphQL names.
pub fn graphql_literal(value: &Value) -> Result<String, SourceError> {
    Ok(match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(graphql_literal)
                .collect::<Result<Vec<_>, _>>()?;
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let fields = map
                .iter()
                .map(|(k, v)| -> Result<String, SourceError> {
                    Ok(format!("{}: {}", check_name(k)?, graphql_literal(v)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            format!("{{{}}}", fields.join(", "))
        }
    })
}

/// A named upstream that resolvers can call.
#[async_trait]
pub trait MeshSource: Send + Sync {
    /// Runs `request` and returns the data under its root field.
    async fn call(&self, request: SourceRequest) -> Result<Value, SourceError>;
}

/// GraphQL-over-HTTP source: `POST {"query": ...}` to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpGraphqlSource {
    http: reqwest::Client,
    endpoint: String,
    headers: Vec<(String, String)>,
}

impl HttpGraphqlSource {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            headers: Vec::new(),
        }
    }

    /// Adds fixed headers sent with every call (store code, auth token).
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MeshSource for HttpGraphqlSource {
    async fn call(&self, request: SourceRequest) -> Result<Value, SourceError> {
        let document = request.to_document()?;
        tracing::debug!(endpoint = %self.endpoint, field = %request.field, "calling source");

        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "query": document }));
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;
        extract_field(body, &request.field)
    }
}

fn extract_field(mut body: Value, field: &str) -> Result<Value, SourceError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(SourceError::Graphql(messages));
        }
    }

    body.get_mut("data")
        .and_then(|data| data.get_mut(field))
        .map(Value::take)
        .ok_or_else(|| SourceError::MissingData {
            field: field.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, Response, StatusCode};
    use crate::server::Server;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[test]
    fn renders_mutation_with_nested_literals() {
        let request = SourceRequest::mutation("setShippingMethodsOnCart", "{ cart { id } }").arg(
            "input",
            json!({
                "cart_id": "abc",
                "shipping_methods": [{ "carrier_code": "flatrate", "method_code": "flatrate" }]
            }),
        );

        assert_eq!(
            request.to_document().unwrap(),
            "mutation { setShippingMethodsOnCart(input: {cart_id: \"abc\", shipping_methods: \
             [{carrier_code: \"flatrate\", method_code: \"flatrate\"}]}) { cart { id } } }"
        );
    }

    #[test]
    fn renders_query_without_args() {
        let request = SourceRequest::query("customer", "{ email }");
        assert_eq!(request.to_document().unwrap(), "query { customer { email } }");
    }

    #[test]
    fn literal_escapes_strings() {
        assert_eq!(graphql_literal(&json!("say \"hi\"")).unwrap(), r#""say \"hi\"""#);
        assert_eq!(graphql_literal(&json!(null)).unwrap(), "null");
        assert_eq!(graphql_literal(&json!([1, true])).unwrap(), "[1, true]");
    }

    #[test]
    fn names_follow_graphql_grammar() {
        assert!(is_graphql_name("sku"));
        assert!(is_graphql_name("_cart_id2"));
        assert!(!is_graphql_name(""));
        assert!(!is_graphql_name("2fa"));
        assert!(!is_graphql_name("sku name"));
        assert!(!is_graphql_name("sk\u{fc}"));
    }

    #[test]
    fn invalid_object_key_is_rejected() {
        let key = r#"sku: "MS09"}]) { cart { id } } evil: deleteCustomer(id: 1) { ok } x: addProductsToCart(cartId: "c", cartItems: [{sku"#;
        let mut item = Map::new();
        item.insert(key.to_owned(), json!("MS09"));
        let request = SourceRequest::mutation("addProductsToCart", "{ cart { id } }")
            .arg("cartId", json!("c"))
            .arg("cartItems", Value::Array(vec![Value::Object(item)]));

        let err = request.to_document().unwrap_err();
        assert!(matches!(err, SourceError::InvalidName { ref name } if name == key));
    }

    #[test]
    fn invalid_argument_name_is_rejected() {
        let request = SourceRequest::query("announcements", "{announcement}")
            .args_from(&json!({ "store) { x } y: announcements(a": 1 }));
        assert!(matches!(
            request.to_document(),
            Err(SourceError::InvalidName { .. })
        ));
    }

    #[test]
    fn graphql_errors_are_surfaced() {
        let err = extract_field(
            json!({ "errors": [{ "message": "cart not found" }], "data": null }),
            "addProductsToCart",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "source returned errors: cart not found");
    }

    #[test]
    fn missing_field_is_an_error() {
        let err = extract_field(json!({ "data": {} }), "customer").unwrap_err();
        assert!(matches!(err, SourceError::MissingData { ref field } if field == "customer"));
    }

    async fn spawn_graphql(seen: Arc<Mutex<Vec<String>>>) -> SocketAddr {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run(move |req: Request| {
            let seen = Arc::clone(&seen);
            async move {
                let body: Value = req.json().unwrap();
                seen.lock()
                    .unwrap()
                    .push(body["query"].as_str().unwrap().to_owned());
                assert_eq!(req.headers().get("store"), Some("default"));
                Response::json(
                    StatusCode::OK,
                    &json!({ "data": { "announcements": { "announcement": "Free shipping!" } } }),
                )
            }
        }));
        addr
    }

    #[tokio::test]
    async fn http_source_posts_query_and_unwraps_field() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = spawn_graphql(Arc::clone(&seen)).await;
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let source = HttpGraphqlSource::new(http, format!("http://{addr}/graphql"))
            .with_headers([("Store", "default")]);

        let data = source
            .call(SourceRequest::query("announcements", "{announcement}"))
            .await
            .unwrap();

        assert_eq!(data, json!({ "announcement": "Free shipping!" }));
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["query { announcements {announcement} }"]
        );
    }

    #[tokio::test]
    async fn http_source_refuses_invalid_keys_before_sending() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = spawn_graphql(Arc::clone(&seen)).await;
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let source = HttpGraphqlSource::new(http, format!("http://{addr}/graphql"))
            .with_headers([("Store", "default")]);

        let err = source
            .call(
                SourceRequest::mutation("addProductsToCart", "{ cart { id } }")
                    .arg("cartItems", json!([{ "sku\") { ok } evil: x(a: \"": "MS09" }])),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::InvalidName { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_source_reports_status() {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run(|_req: Request| async {
            Response::new(StatusCode::BAD_GATEWAY)
        }));
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let source = HttpGraphqlSource::new(http, format!("http://{addr}/graphql"));

        let err = source
            .call(SourceRequest::query("customer", "{ email }"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 502 }));
    }
}
