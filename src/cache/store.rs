//! The host-provided key/value capability.

use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`StateStore`] backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("state store rejected key `{key}`: {reason}")]
    Rejected { key: String, reason: String },
}

/// Persistent string key/value store with per-entry TTL.
///
/// Values are opaque text; callers own the (JSON) encoding. Expiry is the
/// store's business: once an entry's TTL has elapsed, `get` returns `None`.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
