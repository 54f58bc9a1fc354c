//! Boots the full router on an ephemeral port and drives it over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use commerce_ext::actions::ActionEnv;
use commerce_ext::app::{self, AppState};
use commerce_ext::cache::MemoryStore;
use commerce_ext::config::VatSettings;
use commerce_ext::mesh::{MeshServices, RatesClient};
use commerce_ext::{Request, Response, Server, StatusCode};
use serde_json::{Map, Value, json};

struct Harness {
    base: String,
    rate_hits: Arc<AtomicUsize>,
    http: reqwest::Client,
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn spawn_rates(hits: Arc<AtomicUsize>) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.run(move |_req: Request| {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Response::json(StatusCode::OK, &json!([{ "de": 0.19 }, { "fr": 0.2 }]))
        }
    }));
    addr
}

async fn start() -> Harness {
    let rate_hits = Arc::new(AtomicUsize::new(0));
    let rates_addr = spawn_rates(Arc::clone(&rate_hits)).await;

    let services = MeshServices::new(
        Arc::new(MemoryStore::new()),
        RatesClient::with_client(client(), format!("http://{rates_addr}/vatrates")),
        VatSettings::default(),
    );
    let mut defaults = Map::new();
    defaults.insert("LOG_LEVEL".into(), json!("debug"));
    let state = AppState::new(services, ActionEnv::new(client()), defaults);
    let router = Arc::new(app::router(Arc::new(state)));

    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.run(move |req| {
        let router = Arc::clone(&router);
        async move { router.route(req).await }
    }));

    Harness {
        base: format!("http://{addr}"),
        rate_hits,
        http: client(),
    }
}

impl Harness {
    async fn resolve(&self, market: &str, calls: Value) -> Value {
        let response = self
            .http
            .post(format!("{}/mesh/resolve", self.base))
            .header("AC-Policy-Market", market)
            .json(&json!({ "calls": calls }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    fn hits(&self) -> usize {
        self.rate_hits.load(Ordering::SeqCst)
    }
}

fn price(value: f64) -> Value {
    json!({ "type": "ProductViewMoney", "field": "value_with_vat", "root": { "value": value } })
}

#[tokio::test]
async fn health() {
    let h = start().await;
    let body: Value = h
        .http
        .get(format!("{}/health", h.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn concurrent_prices_share_one_rate_fetch() {
    let h = start().await;

    let body = h
        .resolve(
            "de",
            json!([
                price(28.48),
                price(100.0),
                { "type": "ProductViewMoney", "field": "vat_rate" }
            ]),
        )
        .await;

    assert_eq!(body["results"], json!([33.89, 119.0, 0.19]));
    assert_eq!(h.hits(), 1);

    // Next request is served from the store.
    let body = h.resolve("fr", json!([price(10.0)])).await;
    assert_eq!(body["results"], json!([12.0]));
    assert_eq!(h.hits(), 1);
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let h = start().await;
    h.resolve("de", json!([price(1.0)])).await;

    let cleared = h
        .resolve("de", json!([{ "type": "Mutation", "field": "clearCache" }]))
        .await;
    assert_eq!(cleared["results"], json!([true]));

    h.resolve("de", json!([price(1.0)])).await;
    assert_eq!(h.hits(), 2);
}

#[tokio::test]
async fn failing_call_does_not_fail_batch() {
    let h = start().await;
    let body = h
        .resolve(
            "de",
            json!([
                price(10.0),
                { "type": "StoreConfig", "field": "announcement" },
                { "type": "Query", "field": "currentUser" }
            ]),
        )
        .await;

    assert_eq!(body["results"][0], json!(11.9));
    assert_eq!(body["results"][1], Value::Null);
    assert_eq!(
        body["results"][2],
        json!({ "error": "no resolver for Query.currentUser" })
    );
}

#[tokio::test]
async fn malformed_batch_is_rejected() {
    let h = start().await;
    let response = h
        .http
        .post(format!("{}/mesh/resolve", h.base))
        .body("{\"calls\": 3}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn lists_resolvers() {
    let h = start().await;
    let listed: Vec<Value> = h
        .http
        .get(format!("{}/mesh/resolvers", h.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 10);
    assert!(listed.contains(&json!({ "type": "Mutation", "field": "clearCache" })));
}

#[tokio::test]
async fn stock_webhook_round_trip() {
    let h = start().await;
    let url = format!("{}/api/v1/web/commerce/product-validate-stock", h.base);
    let payload = json!({
        "product": { "quantity_and_stock_status": { "is_in_stock": true, "qty": 1 } },
        "info": { "qty": 2 }
    });

    let response = h
        .http
        .post(&url)
        .header("Authorization", "Bearer token")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"op":"exception","message":"The product is out of stock."}"#
    );

    let response = h.http.post(&url).json(&payload).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "missing header(s) 'authorization'");
}

#[tokio::test]
async fn product_columns_filtered_by_query() {
    let h = start().await;
    let body: Value = h
        .http
        .get(format!(
            "{}/api/v1/web/data/product-grid-columns?ids=LUCKY-CAT-BLUE",
            h.base
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let rows = body["productGridColumns"].as_object().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows["LUCKY-CAT-BLUE"]["first_column"], "Lucky Cat");
}

#[tokio::test]
async fn unknown_action_is_404() {
    let h = start().await;
    let response = h
        .http
        .get(format!("{}/api/v1/web/commerce/nope", h.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
