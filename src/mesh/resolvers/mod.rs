//! Field resolvers and the registry that dispatches to them.
//!
//! | Type                | Field                                   | Selection   |
//! |---------------------|-----------------------------------------|-------------|
//! | `ProductViewMoney`  | `value_with_vat`                        | `{ value }` |
//! | `ProductViewMoney`  | `vat_rate`                              |             |
//! | `Mutation`          | `clearCache`                            |             |
//! | `Mutation`          | `addProductsToCartAndSetShippingMethod` |             |
//! | `Mutation`          | `createGuestCartAndAddProductsToCart`   |             |
//! | `StoreConfig`       | `announcement`                          | `{store_code}` |
//! | `CustomerProfile`   | `customer`, `orders`, `wishlist`, `addresses` | `{ email }` |

mod cart;
mod content;
mod customer;
mod vat;

use futures_util::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use super::MeshContext;
use super::sources::{MeshSource, SourceError};

pub use cart::{FLAT_RATE, FREE_SHIPPING, ShippingMethod, shipping_method_for};

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("no resolver for {type_name}.{field_name}")]
    UnknownField {
        type_name: String,
        field_name: String,
    },

    #[error("source `{0}` is not configured")]
    MissingSource(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Parent value and field arguments for one resolver call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveInput {
    #[serde(default)]
    pub root: Value,
    #[serde(default)]
    pub args: Value,
}

impl ResolveInput {
    pub fn new(root: Value, args: Value) -> Self {
        Self { root, args }
    }

    fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    fn str_arg(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

pub type ResolveFn =
    for<'a> fn(&'a MeshContext, ResolveInput) -> BoxFuture<'a, Result<Value, ResolverError>>;

/// One registered field.
#[derive(Clone)]
pub struct FieldResolver {
    pub type_name: &'static str,
    pub field_name: &'static str,
    /// Parent fields the gateway must fetch before calling this resolver.
    pub selection_set: Option<&'static str>,
    resolve: ResolveFn,
}

/// Wire description of a [`FieldResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    pub field: String,
    #[serde(rename = "selectionSet", skip_serializing_if = "Option::is_none")]
    pub selection_set: Option<String>,
}

/// A call in a batch: which field, with what parent and arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveCall {
    #[serde(rename = "type")]
    pub type_name: String,
    pub field: String,
    #[serde(flatten)]
    pub input: ResolveInput,
}

#[derive(Clone, Default)]
pub struct ResolverMap {
    entries: Vec<FieldResolver>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in resolver.
    pub fn standard() -> Self {
        let mut map = Self::new();
        map.register("ProductViewMoney", "value_with_vat", Some("{ value }"), vat::value_with_vat);
        map.register("ProductViewMoney", "vat_rate", None, vat::vat_rate);
        map.register("Mutation", "clearCache", None, vat::clear_cache);
        map.register(
            "Mutation",
            "addProductsToCartAndSetShippingMethod",
            None,
            cart::add_products_and_set_shipping_method,
        );
        map.register(
            "Mutation",
            "createGuestCartAndAddProductsToCart",
            None,
            cart::create_guest_cart_and_add_products,
        );
        map.register("StoreConfig", "announcement", Some("{store_code}"), content::announcement);
        map.register("CustomerProfile", "customer", Some("{ email }"), customer::customer);
        map.register("CustomerProfile", "orders", Some("{ email }"), customer::orders);
        map.register("CustomerProfile", "wishlist", Some("{ email }"), customer::wishlist);
        map.register("CustomerProfile", "addresses", Some("{ email }"), customer::addresses);
        map
    }

    /// Adds a field. A later registration for the same field replaces the earlier one.
    pub fn register(
        &mut self,
        type_name: &'static str,
        field_name: &'static str,
        selection_set: Option<&'static str>,
        resolve: ResolveFn,
    ) {
        self.entries
            .retain(|e| !(e.type_name == type_name && e.field_name == field_name));
        self.entries.push(FieldResolver {
            type_name,
            field_name,
            selection_set,
            resolve,
        });
    }

    pub fn find(&self, type_name: &str, field_name: &str) -> Option<&FieldResolver> {
        self.entries
            .iter()
            .find(|e| e.type_name == type_name && e.field_name == field_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn describe(&self) -> Vec<ResolverInfo> {
        self.entries
            .iter()
            .map(|e| ResolverInfo {
                type_name: e.type_name.to_owned(),
                field: e.field_name.to_owned(),
                selection_set: e.selection_set.map(str::to_owned),
            })
            .collect()
    }

    pub async fn resolve(
        &self,
        ctx: &MeshContext,
        type_name: &str,
        field_name: &str,
        input: ResolveInput,
    ) -> Result<Value, ResolverError> {
        let entry = self
            .find(type_name, field_name)
            .ok_or_else(|| ResolverError::UnknownField {
                type_name: type_name.to_owned(),
                field_name: field_name.to_owned(),
            })?;
        (entry.resolve)(ctx, input).await
    }

    /// Resolves all calls concurrently against one context, so fields that
    /// need the same cached data share a single upstream fetch.
    ///
    /// Results keep call order; a failed call becomes `{"error": message}`.
    pub async fn resolve_all(&self, ctx: &MeshContext, calls: Vec<ResolveCall>) -> Vec<Value> {
        let pending = calls.into_iter().map(|call| async move {
            match self
                .resolve(ctx, &call.type_name, &call.field, call.input)
                .await
            {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        type_name = %call.type_name,
                        field = %call.field,
                        error = %e,
                        "resolver failed"
                    );
                    json!({ "error": e.to_string() })
                }
            }
        });
        join_all(pending).await
    }
}

fn source<'a>(ctx: &'a MeshContext, name: &str) -> Result<&'a dyn MeshSource, ResolverError> {
    ctx.services()
        .source(name)
        .map(|s| s.as_ref())
        .ok_or_else(|| ResolverError::MissingSource(name.to_owned()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared doubles for resolver tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::cache::{MemoryStore, StateStore};
    use crate::config::VatSettings;
    use crate::http::Headers;
    use crate::logging::RecordingLogger;
    use crate::mesh::sources::{MeshSource, SourceError, SourceRequest};
    use crate::mesh::vat_rates::RatesClient;
    use crate::mesh::{MeshContext, MeshServices};

    /// Answers by root field name and records every request.
    #[derive(Default)]
    pub struct ScriptedSource {
        answers: Mutex<HashMap<String, Result<Value, String>>>,
        pub requests: Mutex<Vec<SourceRequest>>,
    }

    impl ScriptedSource {
        pub fn answer(self, field: &str, value: Value) -> Self {
            self.answers.lock().unwrap().insert(field.to_owned(), Ok(value));
            self
        }

        pub fn fail(self, field: &str, message: &str) -> Self {
            self.answers
                .lock()
                .unwrap()
                .insert(field.to_owned(), Err(message.to_owned()));
            self
        }

        pub fn requests(&self) -> Vec<SourceRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MeshSource for ScriptedSource {
        async fn call(&self, request: SourceRequest) -> Result<Value, SourceError> {
            let answer = self.answers.lock().unwrap().get(&request.field).cloned();
            self.requests.lock().unwrap().push(request.clone());
            match answer {
                Some(Ok(value)) => Ok(value),
                Some(Err(message)) => Err(SourceError::Graphql(vec![message])),
                None => Err(SourceError::MissingData {
                    field: request.field,
                }),
            }
        }
    }

    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub logger: Arc<RecordingLogger>,
        pub services: MeshServices,
    }

    impl Fixture {
        /// Services whose VAT endpoint is `rates_endpoint` and with no sources.
        pub fn new(rates_endpoint: &str) -> Self {
            let store = Arc::new(MemoryStore::new());
            let http = reqwest::Client::builder().no_proxy().build().unwrap();
            let services = MeshServices::new(
                store.clone(),
                RatesClient::with_client(http, rates_endpoint),
                VatSettings::default(),
            );
            Self {
                store,
                logger: Arc::new(RecordingLogger::new()),
                services,
            }
        }

        pub fn with_source(mut self, name: &str, source: Arc<ScriptedSource>) -> Self {
            self.services = self.services.with_source(name, source);
            self
        }

        pub fn context(self, headers: &[(&str, &str)]) -> (MeshContext, Arc<MemoryStore>, Arc<RecordingLogger>) {
            let headers: Headers = headers.iter().copied().collect();
            let ctx = MeshContext::new(headers, Arc::new(self.services), self.logger.clone());
            (ctx, self.store, self.logger)
        }
    }

    pub async fn seed(store: &MemoryStore, key: &str, value: &str) {
        store.put(key, value.to_owned(), 60).await.unwrap();
    }
}
