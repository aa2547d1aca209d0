//! Nearby candidate fetching and ranking.
//!
//! # Responsibility
//! - Issue one range query per planned geohash bound, concurrently.
//! - Drop index false positives by exact distance and rank the survivors.
//!
//! # Invariants
//! - Every returned record is public and within `radius_miles` of center.
//! - Output is sorted by endorsements descending, then distance ascending;
//!   full ties keep source order.
//! - One failed bound query fails the whole fetch.

use crate::error::FeedResult;
use crate::geo::{distance_miles, plan_bounds, Bound};
use crate::model::record::{Coordinate, Record};
use crate::repo::{Field, Query, QueryExecutor, SortDirection};
use futures::future::try_join_all;
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::HashSet;

/// A nearby record with its exact distance from the search center.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub record: Record,
    pub distance_miles: f64,
}

/// Public-records range query for one bound.
pub fn bound_query(bound: &Bound) -> Query {
    Query::records()
        .public_only()
        .order_by(Field::LocalityKey, SortDirection::Ascending)
        .start_at(bound.start.as_str())
        .end_at(bound.end.as_str())
}

/// Fetches and ranks public records within `radius_miles` of `center`.
pub async fn fetch_nearby<E>(
    executor: &E,
    center: Coordinate,
    radius_miles: f64,
) -> FeedResult<Vec<RankedRecord>>
where
    E: QueryExecutor + ?Sized,
{
    let bounds = plan_bounds(center, radius_miles);
    if bounds.is_empty() {
        return Ok(Vec::new());
    }

    let queries: Vec<Query> = bounds.iter().map(bound_query).collect();
    let batches = try_join_all(queries.iter().map(|query| executor.query_records(query)))
        .await
        .inspect_err(|err| {
            warn!("event=fetch_nearby module=feed status=error bounds={} error={err}", queries.len());
        })?;

    let mut seen = HashSet::new();
    let candidates: Vec<Record> = batches
        .into_iter()
        .flatten()
        .filter(|record| seen.insert(record.id.clone()))
        .collect();
    let candidate_count = candidates.len();

    let ranked = rank_nearby(candidates, center, radius_miles);
    debug!(
        "event=fetch_nearby module=feed status=ok bounds={} candidates={} ranked={}",
        bounds.len(),
        candidate_count,
        ranked.len()
    );
    Ok(ranked)
}

/// Filters `candidates` to public records inside the radius and sorts them.
pub fn rank_nearby(
    candidates: Vec<Record>,
    center: Coordinate,
    radius_miles: f64,
) -> Vec<RankedRecord> {
    let mut ranked: Vec<RankedRecord> = candidates
        .into_iter()
        .filter(Record::is_public)
        .filter_map(|record| {
            let distance = distance_miles(record.valid_centroid()?, center);
            (distance <= radius_miles).then_some(RankedRecord {
                record,
                distance_miles: distance,
            })
        })
        .collect();

    ranked.sort_by(nearby_order);
    ranked
}

/// Endorsements descending, then distance ascending.
pub fn nearby_order(a: &RankedRecord, b: &RankedRecord) -> Ordering {
    b.record
        .endorsements()
        .cmp(&a.record.endorsements())
        .then_with(|| a.distance_miles.total_cmp(&b.distance_miles))
}
