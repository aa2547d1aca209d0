//! Main highlighted record selection.

use crate::error::FeedResult;
use crate::model::record::Record;
use crate::repo::{Field, Query, QueryExecutor, SortDirection};
use log::{debug, warn};

/// Top public records with at least `min_endorsements`, most endorsed first.
pub fn main_candidates_query(candidate_limit: u32, min_endorsements: u32) -> Query {
    Query::records()
        .public_only()
        .where_gte(Field::EndorsementCount, min_endorsements)
        .order_by(Field::EndorsementCount, SortDirection::Descending)
        .limit(candidate_limit)
}

/// Fetches the main-slot candidate pool.
pub async fn fetch_main_candidates<E>(
    executor: &E,
    candidate_limit: u32,
    min_endorsements: u32,
) -> FeedResult<Vec<Record>>
where
    E: QueryExecutor + ?Sized,
{
    let query = main_candidates_query(candidate_limit, min_endorsements);
    let candidates = executor.query_records(&query).await.inspect_err(|err| {
        warn!("event=fetch_main module=feed status=error error={err}");
    })?;
    debug!(
        "event=fetch_main module=feed status=ok candidates={}",
        candidates.len()
    );
    Ok(candidates)
}

/// Uniform pick among public candidates.
pub fn pick_main(candidates: Vec<Record>, rng: &mut fastrand::Rng) -> Option<Record> {
    let mut public: Vec<Record> = candidates.into_iter().filter(Record::is_public).collect();
    if public.is_empty() {
        return None;
    }
    let index = rng.usize(..public.len());
    Some(public.swap_remove(index))
}
