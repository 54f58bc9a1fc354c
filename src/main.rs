use std::sync::Arc;

use commerce_ext::app::{self, AppState};
use commerce_ext::cache::MemoryStore;
use commerce_ext::config::Settings;
use commerce_ext::logging::init_tracing;
use commerce_ext::server::Server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_settings(&settings, store)?;
    let router = Arc::new(app::router(Arc::new(state)));

    let server = Server::bind(&settings.server.bind).await?;
    info!(
        vat_endpoint = %settings.vat.rates_endpoint,
        sources = settings.sources.len(),
        "commerce-ext ready"
    );

    server
        .run_until(
            move |req| {
                let router = Arc::clone(&router);
                async move { router.route(req).await }
            },
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
        )
        .await?;
    Ok(())
}
