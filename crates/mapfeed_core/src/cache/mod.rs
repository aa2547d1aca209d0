//! Client-side nearby-result cache.
//!
//! # Responsibility
//! - Persist ranked nearby snippets keyed by reference coordinate.
//! - Invalidate entries by fixed-length time window.
//!
//! # Invariants
//! - Cache failures never surface to callers; reads degrade to a miss and
//!   writes to a no-op.
//! - The remote record source stays the authority.

pub mod nearby_cache;
pub mod store;

pub use nearby_cache::{CacheEntry, CacheLookup, NearbyCache, NEARBY_CACHE_KEY};
pub use store::{CacheStoreError, MemoryCacheStore, PersistedCacheStore, SqliteCacheStore};
