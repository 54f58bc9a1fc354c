//! `ProductViewMoney` price fields and the cache-clearing mutation.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};

use super::{ResolveInput, ResolverError};
use crate::mesh::pricing::calculate_price_with_vat;
use crate::mesh::vat_rates::vat_rate_for_request;
use crate::mesh::MeshContext;

fn base_value(root: &Value) -> f64 {
    root.get("value").and_then(Value::as_f64).unwrap_or(0.0)
}

/// Price including the request market's VAT. Falls back to the base value
/// when the result is not a finite number.
pub(super) fn value_with_vat(
    ctx: &MeshContext,
    input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        let base = base_value(&input.root);
        let rate = vat_rate_for_request(ctx).await;
        let with_vat = calculate_price_with_vat(base, rate);

        if !with_vat.is_finite() {
            ctx.logger().error(
                "VAT_CALCULATION_ERROR",
                Some(json!({ "error": "price with VAT is not a finite number", "baseValue": base })),
            );
            return Ok(json!(base));
        }

        ctx.logger().log(
            "VAT_CALCULATION",
            Some(json!({ "baseValue": base, "vatRate": rate, "valueWithVat": with_vat })),
        );
        Ok(json!(with_vat))
    }
    .boxed()
}

pub(super) fn vat_rate(
    ctx: &MeshContext,
    _input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move { Ok(json!(vat_rate_for_request(ctx).await)) }.boxed()
}

/// Deletes `key`, or the VAT table when no key is given. Answers `false`
/// instead of failing.
pub(super) fn clear_cache(
    ctx: &MeshContext,
    input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        let key = input.str_arg("key").map(str::to_owned);
        let target = key
            .clone()
            .unwrap_or_else(|| ctx.services().vat().cache_key.clone());

        match ctx.state().delete(&target).await {
            Ok(()) => {
                match &key {
                    Some(key) => ctx.logger().log("CACHE_CLEARED", Some(json!({ "key": key }))),
                    None => ctx.logger().log("ALL_CACHE_CLEARED", None),
                }
                Ok(Value::Bool(true))
            }
            Err(e) => {
                ctx.logger().error(
                    "CACHE_CLEAR_ERROR",
                    Some(json!({ "error": e.to_string(), "key": key })),
                );
                Ok(Value::Bool(false))
            }
        }
    }
    .boxed()
}
