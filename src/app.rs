//! HTTP surface: routes requests to mesh resolvers and web actions.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /health` | liveness probe |
//! | `GET /mesh/resolvers` | registered resolver fields |
//! | `POST /mesh/resolve` | batch of resolver calls sharing one context |
//! | `GET\|POST /api/v1/web/:package/:action` | web action invocation |

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::actions::{ActionEnv, ActionParams, ActionRegistry, ActionResponse, default_params};
use crate::cache::StateStore;
use crate::config::Settings;
use crate::context::Context;
use crate::http::{Method, Response, StatusCode};
use crate::logging::{EventLogger, TracingEventLogger};
use crate::mesh::{MeshContext, MeshServices, ResolveCall, ResolverMap, SourceError};
use crate::router::Router;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to set up upstream sources: {0}")]
    Sources(#[from] SourceError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything the handlers share for the lifetime of the process.
pub struct AppState {
    services: Arc<MeshServices>,
    resolvers: ResolverMap,
    actions: ActionRegistry,
    env: ActionEnv,
    action_defaults: Map<String, Value>,
    logger: Arc<dyn EventLogger>,
}

impl AppState {
    pub fn new(services: MeshServices, env: ActionEnv, action_defaults: Map<String, Value>) -> Self {
        Self {
            services: Arc::new(services),
            resolvers: ResolverMap::standard(),
            actions: ActionRegistry::standard(),
            env,
            action_defaults,
            logger: Arc::new(TracingEventLogger),
        }
    }

    pub fn from_settings(settings: &Settings, state: Arc<dyn StateStore>) -> Result<Self, AppError> {
        let services = MeshServices::from_settings(settings, state)?;
        let http = reqwest::Client::builder()
            .timeout(settings.vat.request_timeout())
            .build()?;
        Ok(Self::new(
            services,
            ActionEnv::new(http),
            default_params(&settings.actions),
        ))
    }

    /// Replaces the event sink handed to every mesh context.
    pub fn with_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.resolvers = resolvers;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ResolveBatch {
    calls: Vec<ResolveCall>,
}

/// Builds the router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    router.get("/health", |_ctx| async {
        Response::json(StatusCode::OK, &json!({ "status": "ok" }))
    });

    let s = Arc::clone(&state);
    router.get("/mesh/resolvers", move |_ctx| {
        let described = s.resolvers.describe();
        async move { Response::json(StatusCode::OK, &described) }
    });

    let s = Arc::clone(&state);
    router.post("/mesh/resolve", move |ctx| mesh_resolve(Arc::clone(&s), ctx));

    let s = Arc::clone(&state);
    router.on(
        &[Method::Get, Method::Post],
        "/api/v1/web/:package/:action",
        move |ctx| run_action(Arc::clone(&s), ctx),
    );

    router
}

fn bad_request(message: impl std::fmt::Display) -> Response {
    Response::json(
        StatusCode::BAD_REQUEST,
        &json!({ "error": message.to_string() }),
    )
}

async fn mesh_resolve(state: Arc<AppState>, ctx: Context) -> Response {
    let batch: ResolveBatch = match ctx.json() {
        Ok(batch) => batch,
        Err(e) => return bad_request(format!("invalid resolve batch: {e}")),
    };

    let mesh = MeshContext::new(
        ctx.request().headers().clone(),
        Arc::clone(&state.services),
        Arc::clone(&state.logger),
    );
    tracing::debug!(calls = batch.calls.len(), "resolving batch");

    let results = state.resolvers.resolve_all(&mesh, batch.calls).await;
    Response::json(StatusCode::OK, &json!({ "results": results }))
}

async fn run_action(state: Arc<AppState>, ctx: Context) -> Response {
    let package = ctx.params().get("package").unwrap_or_default();
    let action = ctx.params().get("action").unwrap_or_default();

    let params = match ActionParams::from_request(ctx.request(), &state.action_defaults) {
        Ok(params) => params,
        Err(e) => return bad_request(e),
    };

    match state.actions.invoke(&state.env, package, action, params).await {
        Some(response) => action_response(&response),
        None => Response::json(
            StatusCode::NOT_FOUND,
            &json!({ "error": format!("action `{package}/{action}` not found") }),
        ),
    }
}

/// Maps an action result onto HTTP. String bodies are sent as-is; they are
/// already encoded JSON.
fn action_response(response: &ActionResponse) -> Response {
    let status = StatusCode::from_u16(response.status_code());
    match response.body() {
        Value::String(text) => Response::new(status)
            .header("Content-Type", "application/json")
            .body(text.as_str()),
        body => Response::json(status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_body_is_sent_verbatim() {
        let response = action_response(&ActionResponse::ok(json!(r#"{"op":"success"}"#)));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_ref(), br#"{"op":"success"}"#);
    }

    #[test]
    fn error_body_keeps_status() {
        let response = action_response(&ActionResponse::error(
            404,
            json!({ "error": "Something is wrong with your Slack webhook URL." }),
        ));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(response.body_ref()).unwrap();
        assert_eq!(body["error"], "Something is wrong with your Slack webhook URL.");
    }
}
