//! Recently endorsed records.
//!
//! # Responsibility
//! - Resolve the most recent endorsement events to their parent records.
//! - Rank events so owners endorsing their own record sort last.
//! - Collapse to a short list of unique records.
//!
//! # Invariants
//! - Private parents are never returned.
//! - Missing parents are skipped, never fatal.
//! - Each record appears at most once in the output.

use crate::error::{FeedError, FeedResult};
use crate::model::endorsement::EndorsementEvent;
use crate::model::record::{Record, RecordId};
use crate::repo::{Field, Query, QueryExecutor, SortDirection};
use futures::future::try_join_all;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// An endorsement event joined with its public parent record.
#[derive(Debug, Clone, PartialEq)]
pub struct EndorsedPair {
    pub event: EndorsementEvent,
    pub record: Record,
}

impl EndorsedPair {
    pub fn is_self_endorsed(&self) -> bool {
        self.event.is_self_endorsement(&self.record.owner_id)
    }
}

/// Fetches up to `display_count` unique public records from the latest
/// `fetch_limit` endorsement events.
pub async fn fetch_recently_endorsed<E>(
    executor: &E,
    fetch_limit: u32,
    display_count: usize,
) -> FeedResult<Vec<Record>>
where
    E: QueryExecutor + ?Sized,
{
    let query = Query::endorsements()
        .order_by(Field::Timestamp, SortDirection::Descending)
        .limit(fetch_limit);
    let events = executor.query_endorsements(&query).await.inspect_err(|err| {
        warn!("event=fetch_endorsed module=feed status=error stage=events error={err}");
    })?;

    let parents = resolve_parents(executor, &events).await?;
    let pairs = join_public_pairs(events, &parents);
    let records = select_endorsed(pairs, display_count);
    debug!(
        "event=fetch_endorsed module=feed status=ok parents={} records={}",
        parents.len(),
        records.len()
    );
    Ok(records)
}

async fn resolve_parents<E>(
    executor: &E,
    events: &[EndorsementEvent],
) -> FeedResult<HashMap<RecordId, Record>>
where
    E: QueryExecutor + ?Sized,
{
    let mut unique_ids = Vec::new();
    let mut seen = HashSet::new();
    for event in events {
        if seen.insert(event.record_id.as_str()) {
            unique_ids.push(event.record_id.as_str());
        }
    }

    let resolved = try_join_all(unique_ids.iter().map(|id| executor.get_record(id)))
        .await
        .inspect_err(|err| {
            warn!("event=fetch_endorsed module=feed status=error stage=parents error={err}");
        })?;

    Ok(resolved
        .into_iter()
        .flatten()
        .map(|record| (record.id.clone(), record))
        .collect())
}

/// Pairs each event with its public parent, once per (record, event).
pub fn join_public_pairs(
    events: Vec<EndorsementEvent>,
    parents: &HashMap<RecordId, Record>,
) -> Vec<EndorsedPair> {
    let mut seen: HashSet<(RecordId, String)> = HashSet::new();
    let mut pairs = Vec::new();

    for event in events {
        let Some(record) = parents.get(&event.record_id) else {
            let err = FeedError::ParentNotFound {
                record_id: event.record_id.clone(),
                event_id: event.id.clone(),
            };
            info!("event=fetch_endorsed module=feed status=skipped reason={err}");
            continue;
        };
        if record.is_private {
            continue;
        }
        if !seen.insert((record.id.clone(), event.id.clone())) {
            continue;
        }
        pairs.push(EndorsedPair {
            event,
            record: record.clone(),
        });
    }

    pairs
}

/// Self-endorsements after others; otherwise newest first.
pub fn endorsed_order(a: &EndorsedPair, b: &EndorsedPair) -> Ordering {
    match (a.is_self_endorsed(), b.is_self_endorsed()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => b.event.timestamp.cmp(&a.event.timestamp),
    }
}

/// Sorts pairs and keeps the first `display_count` distinct records.
pub fn select_endorsed(mut pairs: Vec<EndorsedPair>, display_count: usize) -> Vec<Record> {
    pairs.sort_by(endorsed_order);

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(display_count);
    for pair in pairs {
        if records.len() >= display_count {
            break;
        }
        if seen.insert(pair.record.id.clone()) {
            records.push(pair.record);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::{join_public_pairs, select_endorsed, EndorsedPair};
    use crate::model::endorsement::EndorsementEvent;
    use crate::model::record::Record;
    use std::collections::HashMap;

    fn pair(record_id: &str, owner: &str, event_id: &str, user: &str, ts: i64) -> EndorsedPair {
        EndorsedPair {
            event: EndorsementEvent::new(event_id, record_id, user, ts),
            record: Record::new(record_id, owner, record_id),
        }
    }

    #[test]
    fn self_endorsement_sorts_after_equal_timestamp_peer() {
        let records = select_endorsed(
            vec![
                pair("own", "alice", "e1", "alice", 100),
                pair("peer", "bob", "e2", "carol", 100),
            ],
            3,
        );
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["peer", "own"]);
    }

    #[test]
    fn self_endorsement_sorts_after_older_peer() {
        let records = select_endorsed(
            vec![
                pair("own", "alice", "e1", "alice", 500),
                pair("peer", "bob", "e2", "carol", 100),
            ],
            3,
        );
        assert_eq!(records[0].id, "peer");
    }

    #[test]
    fn neither_self_endorsed_orders_newest_first() {
        let records = select_endorsed(
            vec![
                pair("old", "alice", "e1", "dan", 100),
                pair("new", "bob", "e2", "carol", 200),
            ],
            3,
        );
        assert_eq!(records[0].id, "new");
    }

    #[test]
    fn selection_stops_at_display_count_of_unique_records() {
        let records = select_endorsed(
            vec![
                pair("a", "o", "e1", "u1", 500),
                pair("a", "o", "e2", "u2", 400),
                pair("b", "o", "e3", "u3", 300),
                pair("c", "o", "e4", "u4", 200),
                pair("d", "o", "e5", "u5", 100),
            ],
            3,
        );
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn join_skips_missing_and_private_parents_and_duplicate_events() {
        let public = Record::new("pub", "o", "public");
        let mut private = Record::new("priv", "o", "private");
        private.is_private = true;
        let parents = HashMap::from([
            (public.id.clone(), public.clone()),
            (private.id.clone(), private),
        ]);

        let pairs = join_public_pairs(
            vec![
                EndorsementEvent::new("e1", "pub", "u1", 3),
                EndorsementEvent::new("e1", "pub", "u1", 3),
                EndorsementEvent::new("e2", "pub", "u2", 2),
                EndorsementEvent::new("e3", "priv", "u3", 1),
                EndorsementEvent::new("e4", "gone", "u4", 0),
            ],
            &parents,
        );
        let keys: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.record.id.as_str(), p.event.id.as_str()))
            .collect();
        assert_eq!(keys, vec![("pub", "e1"), ("pub", "e2")]);
    }
}
