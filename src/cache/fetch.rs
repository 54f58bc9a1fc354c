//! Cache-aside fetching with in-flight deduplication.
//!
//! [`CacheClient::fetch_with_cache`] is the one entry point. For a key it
//!
//! 1. serves the stored JSON if the state store has it,
//! 2. otherwise joins a fetch already running for the key in this client, or
//! 3. starts one: fetch, process, store with the TTL, and publish the result
//!    to every caller that joined in the meantime.
//!
//! Failures never reach the caller. They are logged as `<PREFIX>_FETCH_ERROR`
//! and the caller gets `T::default()`, which for the rate tables is the empty
//! map. Downstream resolvers rely on always receiving a value.
//!
//! Per key, the client moves through `UNSET -> FETCHING -> CACHED`, or back to
//! `UNSET` on any error. Only `FETCHING` has a registry entry, and the running
//! fetch removes its own entry before it settles, so a later miss always
//! starts fresh.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use super::store::{StateStore, StoreError};
use crate::logging::EventLogger;

/// Why a fetch-and-cache cycle failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {status} {status_text}")]
    Status { status: u16, status_text: String },

    #[error("upstream unreachable: {0}")]
    Transport(String),

    #[error("could not process upstream data: {0}")]
    Process(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cached value is not valid JSON for the expected type: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("in-flight value for `{key}` has a different type than requested")]
    TypeMismatch { key: String },

    /// The shared fetch this caller joined failed.
    #[error(transparent)]
    Joined(Arc<FetchError>),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

type Settled = Result<Arc<dyn Any + Send + Sync>, Arc<FetchError>>;
type InFlight = Shared<BoxFuture<'static, Settled>>;
type Registry = Arc<Mutex<HashMap<String, InFlight>>>;

/// Request-scoped cache client.
///
/// Construct one per resolver execution. Every concurrent call made through
/// the same client shares its in-flight registry; separate clients never see
/// each other's pending fetches, only each other's stored values.
pub struct CacheClient {
    state: Arc<dyn StateStore>,
    logger: Arc<dyn EventLogger>,
    in_flight: Registry,
}

impl CacheClient {
    pub fn new(state: Arc<dyn StateStore>, logger: Arc<dyn EventLogger>) -> Self {
        Self {
            state,
            logger,
            in_flight: Arc::default(),
        }
    }

    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    /// Number of keys with a fetch currently running.
    pub fn in_flight_len(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Returns the cached or freshly fetched value for `key`, or
    /// `T::default()` if anything along the way fails.
    ///
    /// `fetch_fn` and `process_fn` run at most once per cache miss per
    /// client, however many callers ask for `key` while the fetch is running.
    pub async fn fetch_with_cache<T, R, F, Fut, P>(
        &self,
        key: &str,
        ttl_seconds: u64,
        fetch_fn: F,
        process_fn: P,
        log_prefix: &str,
    ) -> T
    where
        T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
        R: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, FetchError>> + Send + 'static,
        P: FnOnce(R) -> Result<T, FetchError> + Send + 'static,
    {
        match self
            .try_fetch_with_cache(key, ttl_seconds, fetch_fn, process_fn, log_prefix)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                self.logger.error(
                    &format!("{log_prefix}_FETCH_ERROR"),
                    Some(json!({ "error": e.to_string(), "key": key })),
                );
                T::default()
            }
        }
    }

    async fn try_fetch_with_cache<T, R, F, Fut, P>(
        &self,
        key: &str,
        ttl_seconds: u64,
        fetch_fn: F,
        process_fn: P,
        log_prefix: &str,
    ) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
        R: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, FetchError>> + Send + 'static,
        P: FnOnce(R) -> Result<T, FetchError> + Send + 'static,
    {
        if let Some(cached) = self.state.get(key).await? {
            if !cached.is_empty() {
                self.logger.log(&format!("{log_prefix}_CACHE_HIT"), None);
                return Ok(serde_json::from_str(&cached)?);
            }
        }

        // Check-and-register happens under one lock with no await in
        // between, so exactly one caller per key becomes the owner.
        let (pending, joined) = {
            let mut registry = lock(&self.in_flight);
            match registry.get(key) {
                Some(pending) => (pending.clone(), true),
                None => {
                    let pending =
                        self.start_fetch(key, ttl_seconds, fetch_fn, process_fn, log_prefix);
                    registry.insert(key.to_owned(), pending.clone());
                    (pending, false)
                }
            }
        };

        if joined {
            self.logger
                .log(&format!("{log_prefix}_CACHE_MISS_WAITING_FOR_INFLIGHT"), None);
        } else {
            self.logger
                .log(&format!("{log_prefix}_CACHE_MISS_FETCHING_API"), None);
        }

        let value = pending.await.map_err(FetchError::Joined)?;
        value
            .downcast::<T>()
            .map(|v| T::clone(&v))
            .map_err(|_| FetchError::TypeMismatch {
                key: key.to_owned(),
            })
    }

    fn start_fetch<T, R, F, Fut, P>(
        &self,
        key: &str,
        ttl_seconds: u64,
        fetch_fn: F,
        process_fn: P,
        log_prefix: &str,
    ) -> InFlight
    where
        T: Serialize + Send + Sync + 'static,
        R: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, FetchError>> + Send + 'static,
        P: FnOnce(R) -> Result<T, FetchError> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let logger = Arc::clone(&self.logger);
        let registry = Arc::clone(&self.in_flight);
        let key = key.to_owned();
        let success_event = format!("{log_prefix}_FETCHED_SUCCESS");

        async move {
            let outcome: Result<T, FetchError> = async {
                let raw = fetch_fn().await?;
                let processed = process_fn(raw)?;
                logger.log(&success_event, None);

                let encoded = serde_json::to_string(&processed)?;
                state.put(&key, encoded, ttl_seconds).await?;
                Ok(processed)
            }
            .await;

            lock(&registry).remove(&key);

            match outcome {
                Ok(value) => Ok(Arc::new(value) as Arc<dyn Any + Send + Sync>),
                Err(e) => Err(Arc::new(e)),
            }
        }
        .boxed()
        .shared()
    }
}

// The registry is only touched in short synchronous sections; a poisoned
// lock still holds a consistent map.
fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, InFlight>> {
    registry.lock().unwrap_or_else(|p| p.into_inner())
}
