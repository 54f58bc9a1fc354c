//! Request routing: map URL patterns and HTTP methods to handler functions.
//!
//! | Pattern                     | Example match                          | Captured params        |
//! |-----------------------------|----------------------------------------|------------------------|
//! | `/mesh/resolve`             | `/mesh/resolve`                        | *(none)*               |
//! | `/api/v1/web/:pkg/:action`  | `/api/v1/web/commerce/validate-stock`  | `pkg`, `action`        |
//!
//! Trailing slashes are normalized on both patterns and incoming paths. Routes
//! are matched in registration order; the first match wins.

use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::http::{Method, Request, Response, StatusCode};

/// Type-erased async handler stored by the router.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this automatically.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Parameter(name.to_owned()),
                None => Segment::Static(s.to_owned()),
            })
            .collect();
        Self { segments }
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut parts = split_path(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Parameter(name) => params.insert(name.clone(), part.to_owned()),
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

// Empty segments are dropped, so `/a//b/` and `/a/b` are the same path.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

/// HTTP request router. Unmatched requests get `404 Not Found`.
///
/// # Examples
///
/// ```rust,no_run
/// use commerce_ext::context::Context;
/// use commerce_ext::router::Router;
/// use commerce_ext::http::{Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/health", |_ctx| async { Response::new(StatusCode::OK) });
/// router.post("/api/v1/web/:pkg/:action", |ctx: Context| async move {
///     let action = ctx.params().get("action").unwrap_or_default().to_owned();
///     Response::new(StatusCode::OK).body(action)
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.on(&[Method::Get], path, handler);
    }

    /// Register a handler for `POST` requests matching `path`.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.on(&[Method::Post], path, handler);
    }

    /// Register one handler for several methods on the same pattern.
    pub fn on(&mut self, methods: &[Method], path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        let pattern = Pattern::parse(path);
        for method in methods {
            self.routes.push(Route {
                method: method.clone(),
                pattern: pattern.clone(),
                handler: Arc::clone(&handler),
            });
        }
    }

    /// Return the number of (method, pattern) routes registered.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch `request` to the first matching route.
    pub async fn route(&self, request: Request) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            if &route.method != request.method() {
                return None;
            }
            route
                .pattern
                .matches(request.path())
                .map(|params| (Arc::clone(&route.handler), params))
        });

        match matched {
            Some((handler, params)) => handler(Context::with_params(request, params)).await,
            None => Response::new(StatusCode::NOT_FOUND),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    #[test]
    fn pattern_root_matches_only_root() {
        let pat = Pattern::parse("/");
        assert!(pat.matches("/").is_some());
        assert!(pat.matches("/other").is_none());
    }

    #[test]
    fn pattern_trailing_slash_normalized() {
        let pat = Pattern::parse("/mesh/resolve/");
        assert!(pat.matches("/mesh/resolve").is_some());
        assert!(pat.matches("/mesh/resolve/").is_some());
    }

    #[test]
    fn pattern_extracts_params() {
        let pat = Pattern::parse("/api/v1/web/:pkg/:action");
        let params = pat.matches("/api/v1/web/commerce/product-validate-stock").unwrap();
        assert_eq!(params.get("pkg"), Some("commerce"));
        assert_eq!(params.get("action"), Some("product-validate-stock"));
    }

    #[test]
    fn pattern_rejects_wrong_shape() {
        let pat = Pattern::parse("/api/v1/web/:pkg/:action");
        assert!(pat.matches("/api/v1/web/commerce").is_none());
        assert!(pat.matches("/api/v1/web/a/b/c").is_none());
        assert!(pat.matches("/api/v2/web/a/b").is_none());
    }

    #[tokio::test]
    async fn empty_router_returns_404() {
        let router = Router::new();
        assert!(router.is_empty());
        let res = router.route(make_request("GET", "/")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn method_must_match() {
        let mut router = Router::new();
        router.get("/hello", |_ctx| async { Response::new(StatusCode::OK) });
        let res = router.route(make_request("POST", "/hello")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let mut router = Router::new();
        router.get("/path", |_ctx| async { Response::new(StatusCode::OK) });
        router.get("/path", |_ctx| async { Response::new(StatusCode::CREATED) });
        let res = router.route(make_request("GET", "/path")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn on_registers_every_method() {
        let mut router = Router::new();
        router.on(&[Method::Get, Method::Post], "/a/:x", |ctx: Context| async move {
            let x = ctx.params().get("x").unwrap_or_default().to_owned();
            Response::new(StatusCode::OK).body(x)
        });
        assert_eq!(router.len(), 2);

        let res = router.route(make_request("POST", "/a/42")).await;
        assert_eq!(res.body_ref(), b"42");
        let res = router.route(make_request("GET", "/a/7")).await;
        assert_eq!(res.body_ref(), b"7");
    }
}
