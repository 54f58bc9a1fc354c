//! GraphQL gateway resolvers.
//!
//! A [`MeshContext`] is built per incoming request execution; resolvers in
//! [`ResolverMap`] read headers from it, call upstream [`MeshSource`]s, and
//! read the VAT rate table through its request-scoped cache client.

mod context;
mod headers;
mod pricing;
pub mod resolvers;
pub mod sources;
mod vat_rates;

pub use context::{MeshContext, MeshServices};
pub use headers::get_header_value;
pub use pricing::{calculate_price_with_vat, get_vat_country_code};
pub use resolvers::{ResolveCall, ResolveInput, ResolverError, ResolverInfo, ResolverMap};
pub use sources::{HttpGraphqlSource, MeshSource, SourceError, SourceRequest};
pub use vat_rates::{
    RatesClient, VAT_RATES_LOG_PREFIX, VatRateTable, fetch_vat_rates, process_vat_rates,
    vat_rate_for_request,
};
