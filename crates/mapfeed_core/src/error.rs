//! Feed-level error taxonomy.
//!
//! # Invariants
//! - No variant is fatal to a feed load; the orchestrator degrades the
//!   affected slot to a placeholder.
//! - Only `SourceUnavailable` is ever returned from a public fetch API;
//!   the other variants are logged and absorbed where they occur.

use crate::repo::QueryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for feed fetch APIs.
pub type FeedResult<T> = Result<T, FeedError>;

#[derive(Debug)]
pub enum FeedError {
    /// A remote query failed.
    SourceUnavailable(QueryError),
    /// Nearby search radius was non-positive; means "no nearby results".
    EmptyBounds { radius_miles: f64 },
    /// Persisted cache content could not be parsed.
    CacheCorrupt(String),
    /// An endorsement event points at a record that no longer exists.
    ParentNotFound { record_id: String, event_id: String },
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnavailable(err) => write!(f, "record source unavailable: {err}"),
            Self::EmptyBounds { radius_miles } => {
                write!(f, "no query bounds for radius {radius_miles} miles")
            }
            Self::CacheCorrupt(message) => write!(f, "nearby cache is corrupt: {message}"),
            Self::ParentNotFound {
                record_id,
                event_id,
            } => write!(
                f,
                "endorsement `{event_id}` references missing record `{record_id}`"
            ),
        }
    }
}

impl Error for FeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SourceUnavailable(err) => Some(err),
            Self::EmptyBounds { .. } | Self::CacheCorrupt(_) | Self::ParentNotFound { .. } => None,
        }
    }
}

impl From<QueryError> for FeedError {
    fn from(value: QueryError) -> Self {
        Self::SourceUnavailable(value)
    }
}
