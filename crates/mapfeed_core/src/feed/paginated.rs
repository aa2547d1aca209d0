//! Paginated "trending" and "recently updated" lists.
//!
//! # Invariants
//! - Pages only contain public records.
//! - `next_cursor` is `None` once a page comes back short.

use crate::clock::time_block;
use crate::error::FeedResult;
use crate::model::record::Record;
use crate::repo::{Field, FieldValue, PageCursor, Query, QueryExecutor, SortDirection};
use log::debug;

/// Which paginated list a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Highest score within the recent time blocks.
    Trending,
    /// Most recently updated.
    Recent,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::Recent => "recent",
        }
    }

    fn order_field(self) -> Field {
        match self {
            Self::Trending => Field::Score,
            Self::Recent => Field::LastUpdated,
        }
    }

    fn cursor_value(self, record: &Record) -> FieldValue {
        match self {
            Self::Trending => FieldValue::from(record.score),
            Self::Recent => FieldValue::from(record.last_updated),
        }
    }
}

/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub kind: ListKind,
    pub records: Vec<Record>,
    pub next_cursor: Option<PageCursor>,
}

/// Time blocks considered trending: the current block and `count - 1` before it.
pub fn trending_time_blocks(now_ms: i64, window_ms: i64, count: u32) -> Vec<i64> {
    let current = time_block(now_ms, window_ms);
    (0..i64::from(count)).map(|offset| current - offset).collect()
}

/// Builds the page query for `kind`.
pub fn page_query(
    kind: ListKind,
    time_blocks: &[i64],
    cursor: Option<PageCursor>,
    page_size: u32,
) -> Query {
    let query = match kind {
        ListKind::Trending => Query::records()
            .public_only()
            .where_in(Field::TimeBlock, time_blocks.iter().copied()),
        ListKind::Recent => Query::records().public_only(),
    };
    query
        .order_by(kind.order_field(), SortDirection::Descending)
        .limit(page_size)
        .start_after(cursor)
}

/// Fetches one page; `time_blocks` is only consulted for trending.
pub async fn fetch_page<E>(
    executor: &E,
    kind: ListKind,
    time_blocks: &[i64],
    cursor: Option<PageCursor>,
    page_size: u32,
) -> FeedResult<Page>
where
    E: QueryExecutor + ?Sized,
{
    let query = page_query(kind, time_blocks, cursor, page_size);
    let records: Vec<Record> = executor
        .query_records(&query)
        .await?
        .into_iter()
        .filter(Record::is_public)
        .collect();

    let full_page = records.len() >= page_size as usize;
    let next_cursor = records
        .last()
        .filter(|_| full_page)
        .map(|last| PageCursor {
            value: kind.cursor_value(last),
            id: last.id.clone(),
        });

    debug!(
        "event=fetch_page module=feed status=ok list={} records={} has_more={}",
        kind.as_str(),
        records.len(),
        next_cursor.is_some()
    );
    Ok(Page {
        kind,
        records,
        next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::{page_query, trending_time_blocks, ListKind};
    use crate::repo::{Field, FieldValue, Predicate, SortDirection};

    const SIX_HOURS_MS: i64 = 6 * 60 * 60 * 1000;

    #[test]
    fn trending_blocks_cover_current_and_previous_four() {
        let now = 100 * SIX_HOURS_MS + 5;
        assert_eq!(
            trending_time_blocks(now, SIX_HOURS_MS, 5),
            vec![100, 99, 98, 97, 96]
        );
    }

    #[test]
    fn trending_query_filters_time_blocks_and_orders_by_score() {
        let query = page_query(ListKind::Trending, &[4, 3], None, 3);
        assert!(query.predicates.contains(&Predicate::In(
            Field::TimeBlock,
            vec![FieldValue::Integer(4), FieldValue::Integer(3)]
        )));
        assert_eq!(query.order_by, Some((Field::Score, SortDirection::Descending)));
        assert_eq!(query.limit, Some(3));
    }

    #[test]
    fn recent_query_orders_by_last_updated() {
        let query = page_query(ListKind::Recent, &[], None, 6);
        assert_eq!(
            query.order_by,
            Some((Field::LastUpdated, SortDirection::Descending))
        );
        assert_eq!(query.limit, Some(6));
    }
}
