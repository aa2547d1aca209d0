//! Record source contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the logical query description consumed by every record source.
//! - Isolate SQLite query details from feed ranking and orchestration.
//!
//! # Invariants
//! - Sources return semantic errors (`UnsupportedField`, `InvalidData`) in
//!   addition to transport errors.
//! - Ordering always falls back to record id so pagination is stable.

pub mod query;
pub mod record_source;

pub use query::{
    Collection, Field, FieldValue, PageCursor, Predicate, Query, QueryError, QueryExecutor,
    QueryResult, SortDirection,
};
pub use record_source::SqliteRecordSource;
