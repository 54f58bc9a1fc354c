//! Column values for the custom grid columns, keyed by entity id.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};

use super::{ActionEnv, ActionParams, ActionResponse};

/// Key that applies to every row without its own entry.
pub const WILDCARD_ROW: &str = "*";

pub fn order_rows() -> Value {
    json!({
        "000000001": { "first_column": "value_1", "second_column": 1, "third_column": "2030-12-01T23:25:42+1100" },
        "000000002": { "first_column": 1, "second_column": "test", "third_column": "2011-10-02T23:25:42+0000" },
        "000000003": { "first_column": "value_3", "second_column": 3, "third_column": "2030-14-01T23:25:42+1100" },
        "000000004": { "first_column": "value_1", "second_column": 1, "third_column": "2011-10-02T23:25:42+0000" }
    })
}

pub fn customer_rows() -> Value {
    json!({
        "1": { "first_column": "value_1", "second_column": 1, "third_column": "2030-12-01T23:25:42+1100" },
        "2": { "first_column": 1, "second_column": "test", "third_column": "2011-10-02T23:25:42+0000" }
    })
}

pub fn product_rows() -> Map<String, Value> {
    let rows = json!({
        "Test Product 1": { "first_column": "value_1" },
        "Test Product 2": { "first_column": 1 },
        "Test Product": { "first_column": "Test value" },
        "test-product-26": { "first_column": "Test product value 26" },
        "test-product-30": { "first_column": "Test product value 30" },
        "test-product-82": { "first_column": "Test product value 82" },
        "LUCKY-CAT-BLUE": { "first_column": "Lucky Cat" },
        "APOLLO-CSM-KIT": { "first_column": "Apollo" },
        "*": { "first_column": "Default value first column" }
    });
    match rows {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Keeps the rows named in the comma-separated `ids` (unknown ids are
/// skipped) plus the wildcard row. No `ids` keeps everything.
pub fn select_rows(rows: Map<String, Value>, ids: Option<&str>) -> Map<String, Value> {
    let Some(ids) = ids.filter(|ids| !ids.is_empty()) else {
        return rows;
    };

    let mut selected: Map<String, Value> = ids
        .split(',')
        .filter_map(|id| rows.get(id).map(|row| (id.to_owned(), row.clone())))
        .collect();
    if let Some(wildcard) = rows.get(WILDCARD_ROW) {
        selected.insert(WILDCARD_ROW.to_owned(), wildcard.clone());
    }
    selected
}

pub(super) fn order_columns(_env: &ActionEnv, _params: ActionParams) -> BoxFuture<'_, ActionResponse> {
    async { ActionResponse::ok(json!({ "orderGridColumns": order_rows() })) }.boxed()
}

pub(super) fn customer_columns(
    _env: &ActionEnv,
    _params: ActionParams,
) -> BoxFuture<'_, ActionResponse> {
    async { ActionResponse::ok(json!({ "customerGridColumns": customer_rows() })) }.boxed()
}

pub(super) fn product_columns(_env: &ActionEnv, params: ActionParams) -> BoxFuture<'_, ActionResponse> {
    async move {
        let rows = select_rows(product_rows(), params.str("ids"));
        ActionResponse::ok(json!({ "productGridColumns": rows }))
    }
    .boxed()
}
