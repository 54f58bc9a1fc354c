//! Serverless-style web actions.
//!
//! An action takes the merged [`ActionParams`] of one invocation and
//! returns an [`ActionResponse`]; it never fails outright. Actions are
//! addressed as `<package>/<action>`:
//!
//! | Name | What it does |
//! |---|---|
//! | `commerce/product-validate-stock` | add-to-cart stock webhook |
//! | `events/customer-login` | forwards login events to Slack |
//! | `custom-menu/registration` | Admin menu entries |
//! | `order-custom-mass-action/registration` | order grid mass actions |
//! | `product-custom-mass-action/registration` | product grid mass actions |
//! | `banner-notification/registration` | mass action banner messages |
//! | `order-custom-grid-columns/registration` | order grid column definitions |
//! | `data/order-grid-columns` | order column values |
//! | `data/customer-grid-columns` | customer column values |
//! | `data/product-grid-columns` | product column values, filtered by `ids` |

mod customer_login;
mod grid_columns;
mod params;
pub mod registration;
mod response;
mod stock;
mod utils;

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ActionSettings;

pub use customer_login::SLACK_WEBHOOK_PARAM;
pub use grid_columns::{WILDCARD_ROW, select_rows};
pub use params::{ActionParams, OW_HEADERS, OW_METHOD, OW_PATH};
pub use response::{ActionResponse, ErrorPayload};
pub use utils::{check_missing_request_inputs, error_response, string_parameters};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("request body must be a JSON object")]
    BodyNotObject,

    #[error("parameter `{name}` has an unexpected shape: {source}")]
    InvalidParam {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Outbound capabilities available to actions.
#[derive(Debug, Clone)]
pub struct ActionEnv {
    http: reqwest::Client,
}

impl ActionEnv {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

pub type ActionFn = for<'a> fn(&'a ActionEnv, ActionParams) -> BoxFuture<'a, ActionResponse>;

/// Parameters bound to every invocation, in the host's naming.
pub fn default_params(settings: &ActionSettings) -> Map<String, Value> {
    let mut defaults = Map::new();
    if let Some(hook) = &settings.slack_webhook {
        defaults.insert(SLACK_WEBHOOK_PARAM.to_owned(), Value::String(hook.clone()));
    }
    if let Some(level) = &settings.log_level {
        defaults.insert("LOG_LEVEL".to_owned(), Value::String(level.clone()));
    }
    defaults
}

/// Actions by `<package>/<action>` name.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in action.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("commerce", "product-validate-stock", stock::validate_stock);
        registry.register("events", "customer-login", customer_login::customer_login);
        registry.register("custom-menu", "registration", registration::custom_menu);
        registry.register(
            "order-custom-mass-action",
            "registration",
            registration::order_mass_action,
        );
        registry.register(
            "product-custom-mass-action",
            "registration",
            registration::product_mass_action,
        );
        registry.register(
            "banner-notification",
            "registration",
            registration::banner_notification,
        );
        registry.register(
            "order-custom-grid-columns",
            "registration",
            registration::order_grid_columns_registration,
        );
        registry.register("data", "order-grid-columns", grid_columns::order_columns);
        registry.register("data", "customer-grid-columns", grid_columns::customer_columns);
        registry.register("data", "product-grid-columns", grid_columns::product_columns);
        registry
    }

    pub fn register(&mut self, package: &str, action: &str, run: ActionFn) {
        self.actions.insert(format!("{package}/{action}"), run);
    }

    pub fn get(&self, package: &str, action: &str) -> Option<ActionFn> {
        self.actions.get(&format!("{package}/{action}")).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs the named action, or returns `None` if there is no such action.
    pub async fn invoke(
        &self,
        env: &ActionEnv,
        package: &str,
        action: &str,
        params: ActionParams,
    ) -> Option<ActionResponse> {
        let run = self.get(package, action)?;
        tracing::debug!(package, action, "invoking action");
        Some(run(env, params).await)
    }
}
