//! Geospatial helpers for nearby search.
//!
//! # Responsibility
//! - Compute exact great-circle distances.
//! - Plan geohash range queries that over-approximate a search radius.
//!
//! # Invariants
//! - Planned bounds never miss a point inside the radius; exact filtering
//!   is done by callers with [`distance::distance_miles`].

pub mod bounds;
pub mod distance;
pub mod geohash;

pub use bounds::{plan_bounds, Bound};
pub use distance::distance_miles;
