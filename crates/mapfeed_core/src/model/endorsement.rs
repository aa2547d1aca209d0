//! Endorsement ("star") event model.
//!
//! # Invariants
//! - `id` is unique within its parent record, not globally.
//! - Events are immutable once created.

use crate::model::record::RecordId;
use serde::{Deserialize, Serialize};

/// One user endorsing one record at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementEvent {
    pub id: String,
    /// Parent record reference.
    pub record_id: RecordId,
    /// Endorsing user.
    pub user_id: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl EndorsementEvent {
    pub fn new(
        id: impl Into<String>,
        record_id: impl Into<RecordId>,
        user_id: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            record_id: record_id.into(),
            user_id: user_id.into(),
            timestamp,
        }
    }

    /// Whether the endorsing user is also the record owner.
    pub fn is_self_endorsement(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}
