//! VAT rate table: remote fetch, reshaping, and the cached lookup.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::MeshContext;
use crate::cache::FetchError;

/// Country code (upper case) to decimal rate, `0.19` meaning 19%.
pub type VatRateTable = BTreeMap<String, f64>;

/// Event prefix for the cache wrapper's log lines.
pub const VAT_RATES_LOG_PREFIX: &str = "VAT_RATES";

/// HTTP client for the VAT rate endpoint.
#[derive(Debug, Clone)]
pub struct RatesClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RatesClient {
    /// Builds a client with its own connection pool and request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoint))
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `GET`s the endpoint and returns the decoded JSON body.
    pub async fn fetch_raw(&self) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Process(e.to_string()))
    }
}

/// Flattens `[{"de": 0.19}, {"fr": 0.2}]` into `{"DE": 0.19, "FR": 0.2}`.
///
/// Non-numeric rates and non-object elements are skipped. Anything other than
/// an array yields an empty table.
pub fn process_vat_rates(data: &Value) -> VatRateTable {
    let Some(items) = data.as_array() else {
        return VatRateTable::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|item| item.iter())
        .filter_map(|(code, rate)| rate.as_f64().map(|rate| (code.to_uppercase(), rate)))
        .collect()
}

/// Returns the rate table for this request, from cache when possible.
///
/// Never fails: on any upstream or store error the table is empty.
pub async fn fetch_vat_rates(ctx: &MeshContext) -> VatRateTable {
    let services = ctx.services();
    let client = services.rates().clone();
    let vat = services.vat();

    ctx.cache()
        .fetch_with_cache(
            &vat.cache_key,
            vat.ttl_seconds,
            move || async move { client.fetch_raw().await },
            |raw| Ok(process_vat_rates(&raw)),
            VAT_RATES_LOG_PREFIX,
        )
        .await
}

/// Rate for the market named in the request's policy header, or `0`.
pub async fn vat_rate_for_request(ctx: &MeshContext) -> f64 {
    let rates = fetch_vat_rates(ctx).await;
    let market = super::get_header_value(ctx.headers(), &ctx.services().vat().policy_market_header);

    super::get_vat_country_code(market.as_deref())
        .and_then(|code| rates.get(&code).copied())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, Response, StatusCode};
    use crate::server::Server;
    use serde_json::json;

    #[test]
    fn process_keeps_numeric_rates_upper_cased() {
        let rates = process_vat_rates(&json!([{ "de": 0.19 }, { "fr": "bad" }]));
        assert_eq!(rates, VatRateTable::from([("DE".to_owned(), 0.19)]));
    }

    #[test]
    fn process_reads_every_key_of_an_element() {
        let rates = process_vat_rates(&json!([{ "at": 0.2, "be": 0.21 }, 7, null]));
        assert_eq!(rates.len(), 2);
        assert_eq!(rates["BE"], 0.21);
    }

    #[test]
    fn process_non_array_is_empty() {
        assert!(process_vat_rates(&json!({ "de": 0.19 })).is_empty());
        assert!(process_vat_rates(&json!("oops")).is_empty());
    }

    async fn spawn_rates(status: StatusCode, body: Value) -> String {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run(move |_req: Request| {
            let body = body.clone();
            async move { Response::json(status, &body) }
        }));
        format!("http://{addr}/vatrates")
    }

    fn client(endpoint: String) -> RatesClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        RatesClient::with_client(http, endpoint)
    }

    #[tokio::test]
    async fn fetch_raw_returns_body() {
        let endpoint = spawn_rates(StatusCode::OK, json!([{ "de": 0.19 }])).await;
        let raw = client(endpoint).fetch_raw().await.unwrap();
        assert_eq!(raw, json!([{ "de": 0.19 }]));
    }

    #[tokio::test]
    async fn fetch_raw_maps_non_success_status() {
        let endpoint = spawn_rates(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
        let err = client(endpoint).fetch_raw().await.unwrap_err();
        assert!(
            matches!(err, FetchError::Status { status: 503, ref status_text } if status_text == "Service Unavailable")
        );
        assert_eq!(
            err.to_string(),
            "upstream request failed: 503 Service Unavailable"
        );
    }

    #[tokio::test]
    async fn fetch_raw_reports_unreachable_endpoint() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let server = Server::bind("127.0.0.1:0").await.unwrap();
            server.local_addr()
        };
        let err = client(format!("http://{addr}/vatrates"))
            .fetch_raw()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
