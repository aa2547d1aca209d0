mod common;

use common::{north_of, record_at, CENTER};
use mapfeed_core::cache::store::{CacheStoreError, CacheStoreResult};
use mapfeed_core::cache::NEARBY_CACHE_KEY;
use mapfeed_core::db::open_db_in_memory;
use mapfeed_core::{
    CacheLookup, FeedConfig, FixedClock, MemoryCacheStore, NearbyCache, PersistedCacheStore,
    Record, RecordSnippet, SqliteCacheStore,
};
use std::sync::Arc;

const HOUR_MS: i64 = 60 * 60 * 1000;
// 1h into the window starting at 6h
const NOW_MS: i64 = 7 * HOUR_MS;

fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|index| record_at(&format!("r{index:02}"), north_of(CENTER, index as f64), None))
        .collect()
}

fn cache_at<S: PersistedCacheStore>(store: S, now_ms: i64) -> NearbyCache<S> {
    NearbyCache::new(store, &FeedConfig::default()).with_clock(Arc::new(FixedClock(now_ms)))
}

#[test]
fn write_then_read_preserves_ranked_order_in_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let cache = cache_at(SqliteCacheStore::new(&conn), NOW_MS);
    let stored = records(12);

    assert!(cache.write(&stored, CENTER));

    let expected: Vec<RecordSnippet> = stored.iter().map(Record::snippet).collect();
    assert_eq!(cache.read(CENTER), CacheLookup::Hit(expected));

    let raw: String = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1;",
            [NEARBY_CACHE_KEY],
            |row| row.get(0),
        )
        .unwrap();
    assert!(raw.contains("\"ownerId\":\"owner-r00\""));
}

#[test]
fn fewer_than_ten_records_are_not_cached() {
    let store = MemoryCacheStore::new();
    let cache = cache_at(&store, NOW_MS);

    assert!(!cache.write(&records(9), CENTER));

    assert_eq!(cache.read(CENTER), CacheLookup::Miss);
    assert_eq!(store.get(NEARBY_CACHE_KEY).unwrap(), None);
}

#[test]
fn entries_expire_at_the_next_window_boundary() {
    let store = MemoryCacheStore::new();
    assert!(cache_at(&store, NOW_MS).write(&records(10), CENTER));

    assert!(cache_at(&store, NOW_MS + 4 * HOUR_MS).read(CENTER).is_hit());
    assert_eq!(
        cache_at(&store, 12 * HOUR_MS + 1).read(CENTER),
        CacheLookup::Miss
    );
}

#[test]
fn write_on_window_boundary_is_readable_in_that_window() {
    let store = MemoryCacheStore::new();
    let boundary = 12 * HOUR_MS;
    let cache = cache_at(&store, boundary);

    assert!(cache.write(&records(10), CENTER));

    assert!(cache.read(CENTER).is_hit());
    assert!(cache_at(&store, boundary + 6 * HOUR_MS - 1).read(CENTER).is_hit());
    assert_eq!(
        cache_at(&store, boundary + 6 * HOUR_MS).read(CENTER),
        CacheLookup::Miss
    );
}

#[test]
fn hit_requires_center_within_half_radius() {
    let store = MemoryCacheStore::new();
    let cache = cache_at(&store, NOW_MS);
    assert!(cache.write(&records(10), CENTER));

    assert!(cache.read(north_of(CENTER, 9.0)).is_hit());
    assert_eq!(cache.read(north_of(CENTER, 10.5)), CacheLookup::Miss);
}

#[test]
fn stale_entries_are_pruned_on_write() {
    let store = MemoryCacheStore::new();
    let far = north_of(CENTER, 100.0);
    assert!(cache_at(&store, NOW_MS).write(&records(10), far));
    assert!(cache_at(&store, 13 * HOUR_MS).write(&records(11), CENTER));

    let raw = store.get(NEARBY_CACHE_KEY).unwrap().unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["snippets"].as_array().map(Vec::len), Some(11));
}

#[test]
fn corrupt_value_reads_as_miss_and_is_replaced() {
    let store = MemoryCacheStore::new();
    store.set(NEARBY_CACHE_KEY, "{not json").unwrap();
    let cache = cache_at(&store, NOW_MS);

    assert_eq!(cache.read(CENTER), CacheLookup::Miss);
    assert!(cache.write(&records(10), CENTER));
    assert!(cache.read(CENTER).is_hit());
}

struct BrokenStore;

impl PersistedCacheStore for BrokenStore {
    fn get(&self, _key: &str) -> CacheStoreResult<Option<String>> {
        Err(CacheStoreError::Unavailable("disk full".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> CacheStoreResult<()> {
        Err(CacheStoreError::Unavailable("disk full".to_string()))
    }
}

#[test]
fn store_failures_degrade_to_miss_and_no_op() {
    let cache = cache_at(BrokenStore, NOW_MS);

    assert_eq!(cache.read(CENTER), CacheLookup::Miss);
    assert!(!cache.write(&records(10), CENTER));
}
