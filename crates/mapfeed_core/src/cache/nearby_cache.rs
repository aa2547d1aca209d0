//! Nearby-result cache with time-window invalidation.
//!
//! # Responsibility
//! - Return previously ranked nearby snippets for a close-enough center.
//! - Append fresh entries and prune stale ones on write.
//!
//! # Invariants
//! - An entry created at or before the current window start is never a hit
//!   and is dropped by the next write.
//! - A fresh write is stamped strictly after the window start, so it is
//!   readable for the rest of that window.
//! - Ranked lists shorter than `min_records` are never written.
//! - Store or decode failures make `read` a miss and `write` a no-op; a
//!   corrupt stored value is replaced by the next successful write.

use crate::cache::store::{CacheStoreError, PersistedCacheStore};
use crate::clock::{window_start, Clock, SystemClock};
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::geo::distance_miles;
use crate::model::record::{Coordinate, Record, RecordSnippet};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Store key holding the serialized entry list.
pub const NEARBY_CACHE_KEY: &str = "nearby-cache";

/// Coordinate as persisted; either component may be missing in old data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredCoordinate {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl StoredCoordinate {
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::checked(self.lat?, self.lng?)
    }
}

/// One persisted nearby result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub snippets: Vec<RecordSnippet>,
    /// Creation time, Unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub coordinate: Option<StoredCoordinate>,
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<RecordSnippet>),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

enum LoadError {
    Store(CacheStoreError),
    Corrupt(FeedError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Corrupt(err) => write!(f, "{err}"),
        }
    }
}

/// Local cache manager for nearby results.
pub struct NearbyCache<S: PersistedCacheStore> {
    store: S,
    clock: Arc<dyn Clock>,
    radius_miles: f64,
    window_ms: i64,
    min_records: usize,
}

impl<S: PersistedCacheStore> NearbyCache<S> {
    /// Creates a cache over `store` using the system clock.
    pub fn new(store: S, config: &FeedConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            radius_miles: config.nearby_radius_miles,
            window_ms: config.cache_window_ms,
            min_records: config.min_cache_records,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start of the current freshness window.
    pub fn invalidation_horizon(&self) -> i64 {
        window_start(self.clock.now_ms(), self.window_ms)
    }

    /// Returns the snippets of the first fresh, non-empty entry whose
    /// reference coordinate lies within half the search radius of `center`.
    pub fn read(&self, center: Coordinate) -> CacheLookup {
        let entries = match self.load_entries() {
            Ok(entries) => entries,
            Err(err) => {
                warn!("event=nearby_cache_read module=cache status=error error={err}");
                return CacheLookup::Miss;
            }
        };

        let horizon = self.invalidation_horizon();
        let max_distance = self.radius_miles / 2.0;
        let hit = entries.into_iter().find(|entry| {
            let Some(coordinate) = entry.coordinate.as_ref().and_then(StoredCoordinate::coordinate)
            else {
                return false;
            };
            distance_miles(coordinate, center) < max_distance
                && entry.timestamp > horizon
                && !entry.snippets.is_empty()
        });

        match hit {
            Some(entry) => {
                debug!(
                    "event=nearby_cache_read module=cache status=hit snippets={}",
                    entry.snippets.len()
                );
                CacheLookup::Hit(entry.snippets)
            }
            None => {
                debug!("event=nearby_cache_read module=cache status=miss");
                CacheLookup::Miss
            }
        }
    }

    /// Stores `records` as snippets for `center`.
    ///
    /// Returns whether a new entry was persisted.
    pub fn write(&self, records: &[Record], center: Coordinate) -> bool {
        if records.len() < self.min_records {
            debug!(
                "event=nearby_cache_write module=cache status=skipped reason=too_few_records records={} min={}",
                records.len(),
                self.min_records
            );
            return false;
        }

        let mut entries = match self.load_entries() {
            Ok(entries) => entries,
            Err(LoadError::Corrupt(err)) => {
                warn!("event=nearby_cache_write module=cache status=discarding error={err}");
                Vec::new()
            }
            Err(err @ LoadError::Store(_)) => {
                warn!("event=nearby_cache_write module=cache status=error error={err}");
                return false;
            }
        };

        let now = self.clock.now_ms();
        let horizon = window_start(now, self.window_ms);
        let before = entries.len();
        entries.retain(|entry| entry.timestamp > horizon);
        entries.push(CacheEntry {
            snippets: records.iter().map(Record::snippet).collect(),
            // a write landing exactly on the window start still counts as fresh
            timestamp: now.max(horizon + 1),
            coordinate: Some(StoredCoordinate {
                lat: Some(center.lat),
                lng: Some(center.lng),
            }),
        });

        let serialized = match serde_json::to_string(&entries) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("event=nearby_cache_write module=cache status=error error={err}");
                return false;
            }
        };
        if let Err(err) = self.store.set(NEARBY_CACHE_KEY, &serialized) {
            warn!("event=nearby_cache_write module=cache status=error error={err}");
            return false;
        }

        debug!(
            "event=nearby_cache_write module=cache status=ok pruned={} entries={}",
            before + 1 - entries.len(),
            entries.len()
        );
        true
    }

    fn load_entries(&self) -> Result<Vec<CacheEntry>, LoadError> {
        let Some(raw) = self.store.get(NEARBY_CACHE_KEY).map_err(LoadError::Store)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .map_err(|err| LoadError::Corrupt(FeedError::CacheCorrupt(err.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheLookup, NearbyCache, NEARBY_CACHE_KEY};
    use crate::cache::store::{MemoryCacheStore, PersistedCacheStore};
    use crate::clock::FixedClock;
    use crate::config::{FeedConfig, DEFAULT_CACHE_WINDOW_MS};
    use crate::model::record::{Coordinate, Record};
    use std::sync::Arc;

    const NOW: i64 = 1_000 * DEFAULT_CACHE_WINDOW_MS + 60_000;

    fn records(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(format!("r{i}"), format!("u{i}"), format!("Map {i}")))
            .collect()
    }

    fn cache_at(store: &MemoryCacheStore, now: i64) -> NearbyCache<&MemoryCacheStore> {
        NearbyCache::new(store, &FeedConfig::default()).with_clock(Arc::new(FixedClock(now)))
    }

    #[test]
    fn entry_with_missing_coordinate_is_skipped() {
        let store = MemoryCacheStore::new();
        store
            .set(
                NEARBY_CACHE_KEY,
                &format!(
                    r#"[{{"snippets":[{{"id":"a","ownerId":"u"}}],"timestamp":{NOW},"coordinate":{{"lat":40.0}}}}]"#
                ),
            )
            .unwrap();
        let cache = cache_at(&store, NOW);
        assert_eq!(cache.read(Coordinate::new(40.0, -73.0)), CacheLookup::Miss);
    }

    #[test]
    fn write_prunes_entries_from_previous_windows() {
        let store = MemoryCacheStore::new();
        let center = Coordinate::new(40.0, -73.0);
        let old = cache_at(&store, NOW - DEFAULT_CACHE_WINDOW_MS);
        assert!(old.write(&records(10), center));

        let fresh = cache_at(&store, NOW);
        assert!(fresh.write(&records(12), Coordinate::new(10.0, 10.0)));

        let raw = store.get(NEARBY_CACHE_KEY).unwrap().unwrap();
        let entries: Vec<super::CacheEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].snippets.len(), 12);
    }

    #[test]
    fn corrupt_value_is_a_miss_and_replaced_on_write() {
        let store = MemoryCacheStore::new();
        store.set(NEARBY_CACHE_KEY, "{not json").unwrap();
        let cache = cache_at(&store, NOW);
        let center = Coordinate::new(40.0, -73.0);

        assert_eq!(cache.read(center), CacheLookup::Miss);
        assert!(cache.write(&records(10), center));
        assert!(cache.read(center).is_hit());
    }

    #[test]
    fn far_center_is_a_miss() {
        let store = MemoryCacheStore::new();
        let cache = cache_at(&store, NOW);
        assert!(cache.write(&records(10), Coordinate::new(40.0, -73.0)));
        // ~13.8 miles north: beyond half of the 20 mile radius
        assert_eq!(cache.read(Coordinate::new(40.2, -73.0)), CacheLookup::Miss);
    }
}
