#![allow(dead_code)]

use async_trait::async_trait;
use mapfeed_core::db::open_db_in_memory;
use mapfeed_core::geo::distance::EARTH_RADIUS_MILES;
use mapfeed_core::geo::geohash::{geohash_for_location, GEOHASH_PRECISION};
use mapfeed_core::repo::{Query, QueryError, QueryExecutor, QueryResult};
use mapfeed_core::{Coordinate, EndorsementEvent, Record, SqliteRecordSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const CENTER: Coordinate = Coordinate {
    lat: 40.0,
    lng: -73.0,
};

/// Point `miles` due north of `origin`; exact under the haversine model.
pub fn north_of(origin: Coordinate, miles: f64) -> Coordinate {
    let degrees = (miles / EARTH_RADIUS_MILES).to_degrees();
    Coordinate::new(origin.lat + degrees, origin.lng)
}

/// Point `miles` due east of `origin` along the parallel (approximate).
pub fn east_of(origin: Coordinate, miles: f64) -> Coordinate {
    let degrees = (miles / (EARTH_RADIUS_MILES * origin.lat.to_radians().cos())).to_degrees();
    Coordinate::new(origin.lat, origin.lng + degrees)
}

pub fn record_at(id: &str, at: Coordinate, endorsements: Option<u32>) -> Record {
    let mut record = Record::new(id, format!("owner-{id}"), format!("Map {id}"));
    record.locality_key = geohash_for_location(at, GEOHASH_PRECISION);
    record.centroid = Some(at);
    record.endorsement_count = endorsements;
    record
}

pub fn source_with(records: &[Record]) -> SqliteRecordSource {
    let source = SqliteRecordSource::new(open_db_in_memory().unwrap());
    for record in records {
        source.upsert_record(record).unwrap();
    }
    source
}

pub fn seed_endorsements(source: &SqliteRecordSource, events: &[EndorsementEvent]) {
    for event in events {
        source.insert_endorsement(event).unwrap();
    }
}

/// Executor whose every call fails.
pub struct UnavailableSource;

#[async_trait]
impl QueryExecutor for UnavailableSource {
    async fn query_records(&self, _query: &Query) -> QueryResult<Vec<Record>> {
        Err(QueryError::Unavailable("offline".to_string()))
    }

    async fn query_endorsements(&self, _query: &Query) -> QueryResult<Vec<EndorsementEvent>> {
        Err(QueryError::Unavailable("offline".to_string()))
    }

    async fn get_record(&self, _id: &str) -> QueryResult<Option<Record>> {
        Err(QueryError::Unavailable("offline".to_string()))
    }
}

/// Counts record queries made against the wrapped source.
pub struct CountingSource<E> {
    inner: E,
    record_queries: Arc<AtomicUsize>,
}

impl<E> CountingSource<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            record_queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter that stays readable after the source is moved.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.record_queries)
    }
}

#[async_trait]
impl<E: QueryExecutor> QueryExecutor for CountingSource<E> {
    async fn query_records(&self, query: &Query) -> QueryResult<Vec<Record>> {
        self.record_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_records(query).await
    }

    async fn query_endorsements(&self, query: &Query) -> QueryResult<Vec<EndorsementEvent>> {
        self.inner.query_endorsements(query).await
    }

    async fn get_record(&self, id: &str) -> QueryResult<Option<Record>> {
        self.inner.get_record(id).await
    }
}
