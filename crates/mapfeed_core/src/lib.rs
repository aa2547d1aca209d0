//! Core logic for the map discovery feed.
//! This crate is the single source of truth for feed ranking and caching rules.

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;

pub use cache::{CacheLookup, MemoryCacheStore, NearbyCache, PersistedCacheStore, SqliteCacheStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, FeedConfig};
pub use error::{FeedError, FeedResult};
pub use feed::{
    fetch_nearby, fetch_recently_endorsed, FeedEntry, FeedEvent, FeedOrchestrator, FeedSection,
    FeedSlot, FeedState, ListKind, LoadStatus, NearbySource, Page, RankedRecord,
};
pub use geo::{distance_miles, plan_bounds, Bound};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::endorsement::EndorsementEvent;
pub use model::record::{Coordinate, Record, RecordId, RecordSnippet, ReferenceLocation};
pub use repo::{Query, QueryError, QueryExecutor, SqliteRecordSource};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
