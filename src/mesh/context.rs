use std::collections::HashMap;
use std::sync::Arc;

use super::sources::{HttpGraphqlSource, MeshSource, SourceError};
use super::vat_rates::RatesClient;
use crate::cache::{CacheClient, StateStore};
use crate::config::{Settings, VatSettings};
use crate::http::Headers;
use crate::logging::EventLogger;

/// Long-lived collaborators shared by every resolver execution.
pub struct MeshServices {
    state: Arc<dyn StateStore>,
    rates: RatesClient,
    vat: VatSettings,
    sources: HashMap<String, Arc<dyn MeshSource>>,
}

impl MeshServices {
    pub fn new(state: Arc<dyn StateStore>, rates: RatesClient, vat: VatSettings) -> Self {
        Self {
            state,
            rates,
            vat,
            sources: HashMap::new(),
        }
    }

    /// Builds the VAT client and one HTTP source per configured entry.
    /// All of them share a single connection pool.
    pub fn from_settings(
        settings: &Settings,
        state: Arc<dyn StateStore>,
    ) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(settings.vat.request_timeout())
            .build()?;

        let rates = RatesClient::with_client(http.clone(), settings.vat.rates_endpoint.clone());
        let mut services = Self::new(state, rates, settings.vat.clone());
        for (name, source) in &settings.sources {
            let client = HttpGraphqlSource::new(http.clone(), source.endpoint.clone())
                .with_headers(source.headers.clone());
            services = services.with_source(name.clone(), Arc::new(client));
        }
        Ok(services)
    }

    pub fn with_source(mut self, name: impl Into<String>, source: Arc<dyn MeshSource>) -> Self {
        self.sources.insert(name.into(), source);
        self
    }

    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    pub fn rates(&self) -> &RatesClient {
        &self.rates
    }

    pub fn vat(&self) -> &VatSettings {
        &self.vat
    }

    /// Looks up a source by name, ignoring case.
    pub fn source(&self, name: &str) -> Option<&Arc<dyn MeshSource>> {
        self.sources.get(name).or_else(|| {
            self.sources
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

/// Everything one GraphQL request execution can see.
///
/// Owns the [`CacheClient`], so concurrent resolvers in the same execution
/// share in-flight fetches and nothing leaks into the next request.
pub struct MeshContext {
    headers: Headers,
    services: Arc<MeshServices>,
    logger: Arc<dyn EventLogger>,
    cache: CacheClient,
}

impl MeshContext {
    pub fn new(headers: Headers, services: Arc<MeshServices>, logger: Arc<dyn EventLogger>) -> Self {
        let cache = CacheClient::new(Arc::clone(services.state()), Arc::clone(&logger));
        Self {
            headers,
            services,
            logger,
            cache,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn services(&self) -> &MeshServices {
        &self.services
    }

    pub fn logger(&self) -> &dyn EventLogger {
        self.logger.as_ref()
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    pub fn state(&self) -> &dyn StateStore {
        self.services.state().as_ref()
    }
}
