//! Feed load coordination.
//!
//! # Responsibility
//! - Launch main, endorsed, nearby and first-page list loads concurrently.
//! - Decide cache versus remote for the nearby section.
//! - Turn every sub-load outcome into a [`FeedEvent`] for the reducer.
//!
//! # Invariants
//! - Sub-loads have no ordering dependency; events arrive as each finishes.
//! - No failure aborts the load; a failed section yields `FeedEvent::Failed`.
//! - Without a valid reference location the nearby section is not loaded.

use crate::cache::{CacheLookup, NearbyCache, PersistedCacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::FeedConfig;
use crate::feed::endorsed::fetch_recently_endorsed;
use crate::feed::main_feature::{fetch_main_candidates, pick_main};
use crate::feed::nearby::fetch_nearby;
use crate::feed::paginated::{fetch_page, trending_time_blocks, ListKind};
use crate::feed::state::{FeedEntry, FeedEvent, FeedSection, FeedState, NearbySource};
use crate::model::record::{Coordinate, Record, ReferenceLocation};
use crate::repo::{PageCursor, QueryExecutor};
use futures::future::{self, LocalBoxFuture};
use futures::stream::{self, FuturesUnordered, LocalBoxStream};
use futures::{FutureExt, StreamExt};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};

/// Steps of the nearby sub-load, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearbyPhase {
    CheckingCache,
    CacheHit,
    CacheMiss,
    Querying,
    Ranking,
    CacheWrite,
}

impl NearbyPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckingCache => "checking_cache",
            Self::CacheHit => "cache_hit",
            Self::CacheMiss => "cache_miss",
            Self::Querying => "querying",
            Self::Ranking => "ranking",
            Self::CacheWrite => "cache_write",
        }
    }
}

/// Coordinates one discovery-feed load over a record source and a cache.
pub struct FeedOrchestrator<E: QueryExecutor, S: PersistedCacheStore> {
    executor: E,
    cache: NearbyCache<S>,
    config: FeedConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<fastrand::Rng>,
}

impl<E: QueryExecutor, S: PersistedCacheStore> FeedOrchestrator<E, S> {
    pub fn new(executor: E, cache_store: S, config: FeedConfig) -> Self {
        let cache = NearbyCache::new(cache_store, &config);
        Self {
            executor,
            cache,
            config,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Replaces the wall clock used by the cache and trending windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// Seeds main-slot selection for reproducible picks.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(fastrand::Rng::with_seed(seed));
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn cache(&self) -> &NearbyCache<S> {
        &self.cache
    }

    /// Runs one full load and folds every event into a fresh state.
    pub async fn load(&self, location: Option<&ReferenceLocation>) -> FeedState {
        self.load_events(location)
            .fold(FeedState::new(), |state, event| {
                future::ready(state.apply(event))
            })
            .await
    }

    /// Streams load events in completion order, starting with
    /// `FeedEvent::LoadStarted`.
    pub fn load_events<'a>(
        &'a self,
        location: Option<&ReferenceLocation>,
    ) -> LocalBoxStream<'a, FeedEvent> {
        let center = location.and_then(ReferenceLocation::coordinate);
        if location.is_some() && center.is_none() {
            warn!("event=feed_load module=feed status=degraded reason=invalid_location");
        }
        info!(
            "event=feed_load module=feed status=start nearby_enabled={}",
            center.is_some()
        );

        let mut loads: FuturesUnordered<LocalBoxFuture<'a, FeedEvent>> = FuturesUnordered::new();
        loads.push(self.load_main().boxed_local());
        loads.push(self.load_endorsed().boxed_local());
        if let Some(center) = center {
            loads.push(self.load_nearby(center).boxed_local());
        }
        loads.push(
            self.load_page(ListKind::Trending, None, self.config.trending_first_page_size)
                .boxed_local(),
        );
        loads.push(
            self.load_page(ListKind::Recent, None, self.config.recent_first_page_size)
                .boxed_local(),
        );

        stream::once(future::ready(FeedEvent::LoadStarted {
            nearby_enabled: center.is_some(),
        }))
        .chain(loads)
        .boxed_local()
    }

    /// Loads the main highlighted record.
    pub async fn load_main(&self) -> FeedEvent {
        let candidates = match fetch_main_candidates(
            &self.executor,
            self.config.main_candidate_limit,
            self.config.main_min_endorsements,
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(err) => return failed(FeedSection::Main, &err),
        };

        let picked = match self.rng.lock() {
            Ok(mut rng) => pick_main(candidates, &mut rng),
            Err(poisoned) => pick_main(candidates, &mut poisoned.into_inner()),
        };
        FeedEvent::MainLoaded(picked)
    }

    /// Loads the recently endorsed section.
    pub async fn load_endorsed(&self) -> FeedEvent {
        match fetch_recently_endorsed(
            &self.executor,
            self.config.endorsed_fetch_limit,
            self.config.endorsed_display_count,
        )
        .await
        {
            Ok(records) => FeedEvent::EndorsedLoaded(records),
            Err(err) => failed(FeedSection::Endorsed, &err),
        }
    }

    /// Loads the nearby section, preferring a fresh cache entry.
    pub async fn load_nearby(&self, center: Coordinate) -> FeedEvent {
        let display_count = self.config.nearby_display_count;

        trace_phase(NearbyPhase::CheckingCache);
        if let CacheLookup::Hit(snippets) = self.cache.read(center) {
            if snippets.len() >= self.config.min_cache_records {
                trace_phase(NearbyPhase::CacheHit);
                let entries = snippets
                    .into_iter()
                    .take(display_count)
                    .map(FeedEntry::Snippet)
                    .collect();
                return FeedEvent::NearbyLoaded {
                    entries,
                    source: NearbySource::Cache,
                };
            }
        }
        trace_phase(NearbyPhase::CacheMiss);

        trace_phase(NearbyPhase::Querying);
        let ranked = match fetch_nearby(&self.executor, center, self.config.nearby_radius_miles).await
        {
            Ok(ranked) => ranked,
            Err(err) => return failed(FeedSection::Nearby, &err),
        };
        trace_phase(NearbyPhase::Ranking);
        let records: Vec<Record> = ranked.into_iter().map(|ranked| ranked.record).collect();

        trace_phase(NearbyPhase::CacheWrite);
        self.cache.write(&records, center);

        let entries = records
            .into_iter()
            .take(display_count)
            .map(FeedEntry::Record)
            .collect();
        FeedEvent::NearbyLoaded {
            entries,
            source: NearbySource::Remote,
        }
    }

    /// Fetches the page of `kind` following `cursor`.
    pub async fn load_page(
        &self,
        kind: ListKind,
        cursor: Option<PageCursor>,
        page_size: u32,
    ) -> FeedEvent {
        let time_blocks = match kind {
            ListKind::Trending => trending_time_blocks(
                self.clock.now_ms(),
                self.config.trending_window_ms,
                self.config.trending_time_blocks,
            ),
            ListKind::Recent => Vec::new(),
        };
        let section = match kind {
            ListKind::Trending => FeedSection::Trending,
            ListKind::Recent => FeedSection::Recent,
        };

        match fetch_page(&self.executor, kind, &time_blocks, cursor, page_size).await {
            Ok(page) => FeedEvent::PageLoaded(page),
            Err(err) => failed(section, &err),
        }
    }

    /// Continues the trending list of `state`.
    ///
    /// Returns `None` when the list has no further pages.
    pub async fn next_trending_page(&self, state: &FeedState) -> Option<FeedEvent> {
        let cursor = state.trending.next_cursor.clone()?;
        Some(
            self.load_page(ListKind::Trending, Some(cursor), self.config.page_size)
                .await,
        )
    }

    /// Continues the recently updated list of `state`.
    pub async fn next_recent_page(&self, state: &FeedState) -> Option<FeedEvent> {
        let cursor = state.recent.next_cursor.clone()?;
        Some(
            self.load_page(ListKind::Recent, Some(cursor), self.config.page_size)
                .await,
        )
    }
}

fn trace_phase(phase: NearbyPhase) {
    debug!("event=load_nearby module=feed phase={}", phase.as_str());
}

fn failed(section: FeedSection, err: &dyn std::error::Error) -> FeedEvent {
    warn!(
        "event=feed_section module=feed status=error section={section:?} error={err}"
    );
    FeedEvent::Failed {
        section,
        message: err.to_string(),
    }
}
