//! `commerce/product-validate-stock`: add-to-cart webhook that rejects
//! products which are out of stock or short on quantity.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::utils::{check_missing_request_inputs, error_response, string_parameters};
use super::{ActionEnv, ActionError, ActionParams, ActionResponse};
use crate::logging::ActionLogger;

#[derive(Debug, Deserialize)]
struct Product {
    quantity_and_stock_status: StockStatus,
}

#[derive(Debug, Deserialize)]
struct StockStatus {
    #[serde(default)]
    is_in_stock: Value,
    #[serde(default)]
    qty: Value,
}

#[derive(Debug, Default, Deserialize)]
struct Info {
    #[serde(default)]
    qty: Value,
}

/// Webhook verdict, serialized into the response body as a string.
#[derive(Debug, Serialize)]
struct Verdict {
    op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

const SUCCESS: Verdict = Verdict {
    op: "success",
    message: None,
};

const OUT_OF_STOCK: Verdict = Verdict {
    op: "exception",
    message: Some("The product is out of stock."),
};

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric view of a JSON scalar; Commerce sends quantities as numbers or
/// numeric strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_available(product: &Product, info: &Info) -> bool {
    let status = &product.quantity_and_stock_status;
    let short = match (number(&status.qty), number(&info.qty)) {
        (Some(available), Some(requested)) => available < requested,
        _ => false,
    };
    truthy(&status.is_in_stock) && !short
}

fn verdict(params: &ActionParams) -> Result<Verdict, ActionError> {
    let product: Product = serde_json::from_value(params.get("product").cloned().unwrap_or_default())
        .map_err(|source| ActionError::InvalidParam { name: "product", source })?;
    let info: Info = match params.get("info") {
        Some(info @ Value::Object(_)) => serde_json::from_value(info.clone())
            .map_err(|source| ActionError::InvalidParam { name: "info", source })?,
        _ => Info::default(),
    };

    Ok(if is_available(&product, &info) {
        SUCCESS
    } else {
        OUT_OF_STOCK
    })
}

pub(super) fn validate_stock(
    _env: &ActionEnv,
    params: ActionParams,
) -> BoxFuture<'_, ActionResponse> {
    async move {
        let logger = ActionLogger::new("main", params.str("LOG_LEVEL"));
        logger.info("Calling action product-validate-stock");
        logger.debug(&string_parameters(&params));

        if let Some(message) =
            check_missing_request_inputs(&params, &["product", "info"], &["Authorization"])
        {
            return error_response(400, &message, &logger);
        }

        let body = verdict(&params)
            .and_then(|v| serde_json::to_string(&v).map_err(ActionError::Encode));
        match body {
            Ok(body) => {
                logger.info("200: successful request");
                ActionResponse::ok(Value::String(body))
            }
            Err(e) => {
                logger.error(&e.to_string());
                error_response(500, "server error", &logger)
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> ActionEnv {
        ActionEnv::new(reqwest::Client::new())
    }

    fn params(value: Value) -> ActionParams {
        ActionParams::from_map(value.as_object().cloned().unwrap())
    }

    fn webhook(is_in_stock: Value, qty: Value, requested: Value) -> ActionParams {
        params(json!({
            "product": { "quantity_and_stock_status": { "is_in_stock": is_in_stock, "qty": qty } },
            "info": { "qty": requested },
            "__ow_headers": { "authorization": "Bearer token" }
        }))
    }

    #[tokio::test]
    async fn in_stock_succeeds() {
        let response = validate_stock(&env(), webhook(json!(true), json!(100), json!(2))).await;
        assert_eq!(response, ActionResponse::ok(json!(r#"{"op":"success"}"#)));
    }

    #[tokio::test]
    async fn out_of_stock_is_exception() {
        let response = validate_stock(&env(), webhook(json!(false), json!(100), json!(2))).await;
        assert_eq!(
            response.body(),
            &json!(r#"{"op":"exception","message":"The product is out of stock."}"#)
        );
        assert_eq!(response.status_code(), 200);
    }

    #[tokio::test]
    async fn insufficient_quantity_is_exception() {
        let response = validate_stock(&env(), webhook(json!(1), json!("3"), json!(5))).await;
        assert!(response.body().as_str().unwrap().contains("exception"));
    }

    #[tokio::test]
    async fn missing_inputs_are_400() {
        let response = validate_stock(&env(), params(json!({ "product": {} }))).await;
        assert_eq!(
            response,
            ActionResponse::error(
                400,
                json!({ "error": "missing header(s) 'authorization' and missing parameter(s) 'info'" })
            )
        );
    }

    #[tokio::test]
    async fn malformed_product_is_500() {
        let response = validate_stock(
            &env(),
            params(json!({
                "product": { "sku": "MS09" },
                "info": { "qty": 1 },
                "__ow_headers": { "authorization": "Bearer token" }
            })),
        )
        .await;
        assert_eq!(
            response,
            ActionResponse::error(500, json!({ "error": "server error" }))
        );
    }
}
