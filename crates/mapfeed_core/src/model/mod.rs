//! Feed domain model.
//!
//! # Responsibility
//! - Define the map record, coordinate and endorsement shapes shared by
//!   every feed source.
//!
//! # Invariants
//! - Every record is identified by a stable string `RecordId`.
//! - Private records never leave the source layer into a feed output.

pub mod endorsement;
pub mod record;
