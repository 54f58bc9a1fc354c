//! `CustomerProfile` fields backed by the Commerce `customer` query.
//!
//! The caller is assumed to be authenticated already; each field forwards
//! the request to `CommerceAPI` and falls back to an empty value on failure.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};

use super::{ResolveInput, ResolverError, source};
use crate::mesh::MeshContext;
use crate::mesh::sources::SourceRequest;

const COMMERCE_API: &str = "CommerceAPI";

const CUSTOMER_FIELDS: &str = "{ id email firstname lastname date_of_birth created_at \
                               default_billing default_shipping gender }";

const WISHLIST_FIELDS: &str = "{ wishlist { id items_count items { id product { uid name sku \
     price_range { minimum_price { regular_price { value currency } \
     final_price { value currency } } } } } } }";

const ADDRESS_FIELDS: &str = "{ addresses { id firstname lastname street city \
     region { region_code region } postcode country_code telephone \
     default_shipping default_billing } }";

const DEFAULT_PAGE_SIZE: u64 = 20;

fn orders_selection(current_page: u64, page_size: u64) -> String {
    format!(
        "{{ orders(currentPage: {current_page} pageSize: {page_size}) {{ items {{ id number \
         order_date status carrier email total {{ grand_total {{ value currency }} \
         subtotal {{ value currency }} }} items {{ product_name product_sku quantity_ordered \
         product_sale_price {{ value currency }} }} }} page_info {{ current_page page_size \
         total_pages }} total_count }} }}"
    )
}

async fn query_customer(ctx: &MeshContext, selection: String) -> Result<Value, ResolverError> {
    let customer = source(ctx, COMMERCE_API)?
        .call(SourceRequest::query("customer", selection))
        .await?;
    Ok(customer)
}

/// Runs the customer query and picks `field` out of it (or the whole
/// customer when `field` is `None`); null, missing or failed gives `fallback`.
async fn customer_field(
    ctx: &MeshContext,
    selection: String,
    field: Option<&str>,
    fallback: Value,
) -> Value {
    match query_customer(ctx, selection).await {
        Ok(customer) => {
            let picked = match field {
                Some(field) => customer.get(field).cloned(),
                None => Some(customer),
            };
            picked.filter(|v| !v.is_null()).unwrap_or(fallback)
        }
        Err(e) => {
            tracing::warn!(error = %e, field = field.unwrap_or("customer"), "customer lookup failed");
            fallback
        }
    }
}

fn positive_arg(input: &ResolveInput, name: &str) -> Option<u64> {
    input.arg(name).and_then(Value::as_u64).filter(|n| *n > 0)
}

pub(super) fn customer(
    ctx: &MeshContext,
    _input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move { Ok(customer_field(ctx, CUSTOMER_FIELDS.to_owned(), None, Value::Null).await) }
        .boxed()
}

pub(super) fn orders(
    ctx: &MeshContext,
    input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        let page = positive_arg(&input, "currentPage").unwrap_or(1);
        let size = positive_arg(&input, "pageSize").unwrap_or(DEFAULT_PAGE_SIZE);
        let empty = json!({ "items": [], "total_count": 0 });
        Ok(customer_field(ctx, orders_selection(page, size), Some("orders"), empty).await)
    }
    .boxed()
}

pub(super) fn wishlist(
    ctx: &MeshContext,
    _input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        Ok(customer_field(ctx, WISHLIST_FIELDS.to_owned(), Some("wishlist"), Value::Null).await)
    }
    .boxed()
}

pub(super) fn addresses(
    ctx: &MeshContext,
    _input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        Ok(customer_field(ctx, ADDRESS_FIELDS.to_owned(), Some("addresses"), json!([])).await)
    }
    .boxed()
}
