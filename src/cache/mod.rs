//! Cache-aside fetching over a pluggable key/value store.
//!
//! [`StateStore`] is the persistence capability the host hands in,
//! [`MemoryStore`] the in-process implementation the server uses, and
//! [`CacheClient`] the request-scoped layer that adds in-flight
//! deduplication and fail-open semantics on top.

mod fetch;
mod memory;
mod store;

pub use fetch::{CacheClient, FetchError};
pub use memory::MemoryStore;
pub use store::{StateStore, StoreError};
