//! In-process [`StateStore`] backed by a moka cache with per-entry TTLs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::store::{StateStore, StoreError};

/// Default number of keys held before moka starts evicting.
const DEFAULT_CAPACITY: u64 = 10_000;

/// Longest TTL accepted by `put` (100 years).
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct Stored {
    value: String,
    ttl: Duration,
}

/// Each entry lives for the TTL it was written with; a rewrite restarts it.
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Stored, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-wide store shared by every request context.
///
/// Expiry and eviction are handled by moka; there is no purge loop to run.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Stored>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Number of live entries, after moka has applied pending expirations.
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count() as usize
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).await.map(|stored| stored.value))
    }

    async fn put(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), StoreError> {
        let ttl = Duration::from_secs(ttl_seconds);
        if ttl > MAX_TTL {
            return Err(StoreError::Rejected {
                key: key.to_owned(),
                reason: format!("ttl of {ttl_seconds}s exceeds the {}s limit", MAX_TTL.as_secs()),
            });
        }

        // A zero TTL is already expired; it only removes what was there.
        if ttl.is_zero() {
            self.entries.invalidate(key).await;
            return Ok(());
        }

        self.entries.insert(key.to_owned(), Stored { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new();
        store.put("VAT_RATES", r#"{"DE":0.19}"#.into(), 60).await.unwrap();
        assert_eq!(
            store.get("VAT_RATES").await.unwrap().as_deref(),
            Some(r#"{"DE":0.19}"#)
        );
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_ttl_is_immediately_expired() {
        let store = MemoryStore::new();
        store.put("k", "v".into(), 60).await.unwrap();
        store.put("k", "v2".into(), 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn entry_expires_after_its_ttl() {
        let store = MemoryStore::new();
        store.put("short", "v".into(), 1).await.unwrap();
        store.put("long", "v".into(), 60).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_200)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn rewrite_replaces_value_and_ttl() {
        let store = MemoryStore::new();
        store.put("k", "old".into(), 1).await.unwrap();
        store.put("k", "new".into(), 60).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_200)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn delete_removes() {
        let store = MemoryStore::new();
        store.put("k", "v".into(), 60).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        // deleting a missing key is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn absurd_ttl_is_rejected() {
        let store = MemoryStore::new();
        let err = store.put("k", "v".into(), u64::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
