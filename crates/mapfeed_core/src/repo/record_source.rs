//! SQLite-backed record source.
//!
//! # Responsibility
//! - Execute logical [`Query`] descriptions against `records` and
//!   `endorsements` tables.
//! - Provide seeding writes for local demos and tests.
//!
//! # Invariants
//! - Every query is validated before SQL is built.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Result order is deterministic: order field, then id ascending.

use crate::model::endorsement::EndorsementEvent;
use crate::model::record::{Coordinate, Record};
use crate::repo::query::{
    Collection, FieldValue, PageCursor, Predicate, Query, QueryError, QueryExecutor, QueryResult,
    SortDirection,
};
use async_trait::async_trait;
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};

const RECORD_COLUMNS: &str = "id, owner_id, title, locality_key, centroid_lat, centroid_lng,
    endorsement_count, is_private, score, time_block, last_updated";
const ENDORSEMENT_COLUMNS: &str = "id, record_id, user_id, timestamp";

/// Record source over one owned SQLite connection.
pub struct SqliteRecordSource {
    conn: Mutex<Connection>,
}

impl SqliteRecordSource {
    /// Wraps a migrated connection, see [`crate::db::open_db`].
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Inserts or replaces one record.
    pub fn upsert_record(&self, record: &Record) -> QueryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (
                id,
                owner_id,
                title,
                locality_key,
                centroid_lat,
                centroid_lng,
                endorsement_count,
                is_private,
                score,
                time_block,
                last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                record.id.as_str(),
                record.owner_id.as_str(),
                record.title.as_str(),
                record.locality_key.as_str(),
                record.centroid.map(|c| c.lat),
                record.centroid.map(|c| c.lng),
                record.endorsement_count,
                i64::from(record.is_private),
                record.score,
                record.time_block,
                record.last_updated,
            ],
        )?;
        Ok(())
    }

    /// Removes one record. Endorsements referencing it are kept.
    pub fn delete_record(&self, id: &str) -> QueryResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM records WHERE id = ?1;", params![id])?;
        Ok(())
    }

    /// Inserts one endorsement event. Events are immutable.
    pub fn insert_endorsement(&self, event: &EndorsementEvent) -> QueryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO endorsements (id, record_id, user_id, timestamp)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                event.id.as_str(),
                event.record_id.as_str(),
                event.user_id.as_str(),
                event.timestamp,
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> QueryResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| QueryError::ConnectionPoisoned)
    }

    fn run<T>(
        &self,
        query: &Query,
        expected: Collection,
        parse: impl Fn(&Row<'_>) -> QueryResult<T>,
    ) -> QueryResult<Vec<T>> {
        if query.collection != expected {
            return Err(QueryError::InvalidQuery(format!(
                "expected `{}` query, got `{}`",
                expected.as_str(),
                query.collection.as_str()
            )));
        }
        query.validate()?;

        let (sql, bind_values) = build_select(query)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse(row)?);
        }

        debug!(
            "event=source_query module=repo status=ok collection={} rows={}",
            expected.as_str(),
            items.len()
        );
        Ok(items)
    }
}

#[async_trait]
impl QueryExecutor for SqliteRecordSource {
    async fn query_records(&self, query: &Query) -> QueryResult<Vec<Record>> {
        self.run(query, Collection::Records, parse_record_row)
            .inspect_err(|err| {
                error!("event=source_query module=repo status=error collection=records error={err}");
            })
    }

    async fn query_endorsements(&self, query: &Query) -> QueryResult<Vec<EndorsementEvent>> {
        self.run(query, Collection::Endorsements, parse_endorsement_row)
            .inspect_err(|err| {
                error!(
                    "event=source_query module=repo status=error collection=endorsements error={err}"
                );
            })
    }

    async fn get_record(&self, id: &str) -> QueryResult<Option<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1;"
        ))?;
        let row = stmt
            .query_row(params![id], |row| Ok(parse_record_row(row)))
            .optional()?;
        row.transpose()
    }
}

fn build_select(query: &Query) -> QueryResult<(String, Vec<Value>)> {
    let (columns, table, id_order) = match query.collection {
        Collection::Records => (RECORD_COLUMNS, "records", "id ASC"),
        Collection::Endorsements => (ENDORSEMENT_COLUMNS, "endorsements", "record_id ASC, id ASC"),
    };
    let mut sql = format!("SELECT {columns} FROM {table} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    for predicate in &query.predicates {
        match predicate {
            Predicate::Eq(field, value) => {
                sql.push_str(&format!(" AND {} = ?", field.as_str()));
                bind_values.push(to_sql_value(value));
            }
            Predicate::Gte(field, value) => {
                sql.push_str(&format!(" AND {} >= ?", field.as_str()));
                bind_values.push(to_sql_value(value));
            }
            Predicate::In(field, values) => {
                if values.is_empty() {
                    sql.push_str(" AND 1 = 0");
                    continue;
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!(" AND {} IN ({placeholders})", field.as_str()));
                bind_values.extend(values.iter().map(to_sql_value));
            }
        }
    }

    if let Some((field, direction)) = query.order_by {
        let column = field.as_str();
        let (lower, upper) = match direction {
            SortDirection::Ascending => (">=", "<="),
            SortDirection::Descending => ("<=", ">="),
        };
        if let Some(start) = &query.start_at {
            sql.push_str(&format!(" AND {column} {lower} ?"));
            bind_values.push(to_sql_value(start));
        }
        if let Some(end) = &query.end_at {
            sql.push_str(&format!(" AND {column} {upper} ?"));
            bind_values.push(to_sql_value(end));
        }
        if let Some(cursor) = &query.start_after {
            if query.collection != Collection::Records {
                return Err(QueryError::InvalidQuery(
                    "cursor pagination is only supported on records".to_string(),
                ));
            }
            push_cursor_clause(&mut sql, &mut bind_values, column, direction, cursor);
        }

        let keyword = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {column} {keyword}, {id_order}"));
    } else {
        sql.push_str(&format!(" ORDER BY {id_order}"));
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    Ok((sql, bind_values))
}

/// SQLite sorts NULL first ascending and last descending; the clause
/// follows that placement when the cursor value itself is NULL.
fn push_cursor_clause(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &str,
    direction: SortDirection,
    cursor: &PageCursor,
) {
    let id = Value::Text(cursor.id.clone());
    match (&cursor.value, direction) {
        (FieldValue::Null, SortDirection::Ascending) => {
            sql.push_str(&format!(
                " AND ({column} IS NOT NULL OR ({column} IS NULL AND id > ?))"
            ));
            bind_values.push(id);
        }
        (FieldValue::Null, SortDirection::Descending) => {
            sql.push_str(&format!(" AND ({column} IS NULL AND id > ?)"));
            bind_values.push(id);
        }
        (value, direction) => {
            let beyond = match direction {
                SortDirection::Ascending => ">",
                SortDirection::Descending => "<",
            };
            let trailing_nulls = match direction {
                SortDirection::Ascending => String::new(),
                SortDirection::Descending => format!(" OR {column} IS NULL"),
            };
            sql.push_str(&format!(
                " AND ({column} {beyond} ? OR ({column} = ? AND id > ?){trailing_nulls})"
            ));
            let value = to_sql_value(value);
            bind_values.push(value.clone());
            bind_values.push(value);
            bind_values.push(id);
        }
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Real(number) => Value::Real(*number),
        FieldValue::Text(text) => Value::Text(text.clone()),
    }
}

fn parse_record_row(row: &Row<'_>) -> QueryResult<Record> {
    let id: String = row.get("id")?;

    let centroid = match (
        row.get::<_, Option<f64>>("centroid_lat")?,
        row.get::<_, Option<f64>>("centroid_lng")?,
    ) {
        (Some(lat), Some(lng)) => Coordinate::checked(lat, lng),
        _ => None,
    };

    let endorsement_count = match row.get::<_, Option<i64>>("endorsement_count")? {
        Some(count) => Some(u32::try_from(count).map_err(|_| {
            QueryError::InvalidData(format!(
                "invalid endorsement_count `{count}` for record `{id}`"
            ))
        })?),
        None => None,
    };

    let is_private = match row.get::<_, i64>("is_private")? {
        0 => false,
        1 => true,
        other => {
            return Err(QueryError::InvalidData(format!(
                "invalid is_private value `{other}` for record `{id}`"
            )));
        }
    };

    Ok(Record {
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        locality_key: row.get("locality_key")?,
        centroid,
        endorsement_count,
        is_private,
        score: row.get("score")?,
        time_block: row.get("time_block")?,
        last_updated: row.get("last_updated")?,
        id,
    })
}

fn parse_endorsement_row(row: &Row<'_>) -> QueryResult<EndorsementEvent> {
    Ok(EndorsementEvent {
        id: row.get("id")?,
        record_id: row.get("record_id")?,
        user_id: row.get("user_id")?,
        timestamp: row.get("timestamp")?,
    })
}
