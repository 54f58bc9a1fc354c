//! Cart mutations that chain two upstream calls.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{Value, json};

use super::{ResolveInput, ResolverError, source};
use crate::mesh::MeshContext;
use crate::mesh::sources::SourceRequest;

const COMMERCE: &str = "Commerce";
const GUEST_COMMERCE: &str = "ACOMGQL";

const CART_TOTALS: &str = "{ cart { id total_quantity } }";
const GUEST_CART_ITEMS: &str =
    "{ cart { id items { quantity product { name sku } } } user_errors { code message } }";

/// Carrier/method pair as `setShippingMethodsOnCart` expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShippingMethod {
    pub carrier_code: &'static str,
    pub method_code: &'static str,
}

pub const FLAT_RATE: ShippingMethod = ShippingMethod {
    carrier_code: "flatrate",
    method_code: "flatrate",
};

pub const FREE_SHIPPING: ShippingMethod = ShippingMethod {
    carrier_code: "freeshipping",
    method_code: "freeshipping",
};

/// Carts of up to four items ship flat-rate, larger ones ship free.
pub fn shipping_method_for(total_quantity: f64) -> ShippingMethod {
    if total_quantity <= 4.0 {
        FLAT_RATE
    } else {
        FREE_SHIPPING
    }
}

/// `addProductsToCart`, then pick and set the shipping method from the
/// resulting quantity. Returns `{ cartId }`.
pub(super) fn add_products_and_set_shipping_method(
    ctx: &MeshContext,
    input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        let cart_id = input
            .str_arg("cartId")
            .ok_or_else(|| ResolverError::InvalidArgs("`cartId` is required".into()))?
            .to_owned();
        let product = input.arg("product").cloned().unwrap_or(Value::Null);
        let commerce = source(ctx, COMMERCE)?;

        let added = commerce
            .call(
                SourceRequest::mutation("addProductsToCart", CART_TOTALS)
                    .arg("cartId", json!(cart_id))
                    .arg("cartItems", json!([product])),
            )
            .await?;

        if let Some(errors) = added.get("errors").filter(|e| !e.is_null()) {
            return Err(ResolverError::Upstream(errors.to_string()));
        }
        let total_quantity = added
            .pointer("/cart/total_quantity")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ResolverError::Upstream("addProductsToCart returned no total_quantity".into())
            })?;
        let method = shipping_method_for(total_quantity);

        let shipped = commerce
            .call(
                SourceRequest::mutation("setShippingMethodsOnCart", CART_TOTALS).arg(
                    "input",
                    json!({ "cart_id": cart_id, "shipping_methods": [method] }),
                ),
            )
            .await?;

        let id = shipped.pointer("/cart/id").cloned().ok_or_else(|| {
            ResolverError::Upstream("setShippingMethodsOnCart returned no cart id".into())
        })?;
        Ok(json!({ "cartId": id }))
    }
    .boxed()
}

/// `createGuestCart`, then add `cartItem` to it. Failures are reported in
/// the result as a JSON string rather than as a field error.
pub(super) fn create_guest_cart_and_add_products(
    ctx: &MeshContext,
    input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        match guest_cart(ctx, &input).await {
            Ok(value) => Ok(value),
            Err(e) => {
                ctx.logger()
                    .error("GUEST_CART_ERROR", Some(json!({ "error": e.to_string() })));
                Ok(Value::String(json!({ "message": e.to_string() }).to_string()))
            }
        }
    }
    .boxed()
}

async fn guest_cart(ctx: &MeshContext, input: &ResolveInput) -> Result<Value, ResolverError> {
    let item = input.arg("cartItem").cloned().unwrap_or(Value::Null);
    let acom = source(ctx, GUEST_COMMERCE)?;

    let created = acom
        .call(SourceRequest::mutation("createGuestCart", "{ cart { id } }"))
        .await?;
    let cart_id = created
        .pointer("/cart/id")
        .cloned()
        .ok_or_else(|| ResolverError::Upstream("createGuestCart returned no cart id".into()))?;

    let added = acom
        .call(
            SourceRequest::mutation("addProductsToCart", GUEST_CART_ITEMS)
                .arg("cartId", cart_id.clone())
                .arg("cartItems", json!([item])),
        )
        .await?;

    Ok(json!({ "createGuestCart": cart_id, "addProductsToCart": added }))
}
