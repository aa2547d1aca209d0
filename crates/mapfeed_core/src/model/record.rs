//! Map record domain model.
//!
//! # Responsibility
//! - Define the canonical map artifact surfaced by the discovery feed.
//! - Provide coordinate sanity checks used by nearby search and caching.
//!
//! # Invariants
//! - `id` is stable and unique per record.
//! - A missing endorsement count is read as zero.
//! - A malformed centroid is treated as absent, never as `(0, 0)`.

use serde::{Deserialize, Serialize};

/// Stable identifier of a map record.
pub type RecordId = String;

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the coordinate only when both components are finite and in range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let candidate = Self::new(lat, lng);
        candidate.is_valid().then_some(candidate)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Caller-supplied visitor location, usually from a network lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLocation {
    pub lat: f64,
    pub lng: f64,
    pub city: Option<String>,
}

impl ReferenceLocation {
    /// Returns the location as a coordinate, or `None` when it is malformed.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::checked(self.lat, self.lng)
    }
}

/// User-generated map artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner_id: String,
    pub title: String,
    /// Externally computed geohash of the centroid.
    pub locality_key: String,
    pub centroid: Option<Coordinate>,
    pub endorsement_count: Option<u32>,
    pub is_private: bool,
    /// Trending score for the record's `time_block`.
    pub score: Option<f64>,
    /// Index of the fixed-length time window the score belongs to.
    pub time_block: Option<i64>,
    /// Unix epoch milliseconds of the last edit.
    pub last_updated: i64,
}

impl Record {
    /// Creates a public record with no location, score or endorsements.
    pub fn new(
        id: impl Into<RecordId>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            locality_key: String::new(),
            centroid: None,
            endorsement_count: None,
            is_private: false,
            score: None,
            time_block: None,
            last_updated: 0,
        }
    }

    /// Endorsement count with absent values read as zero.
    pub fn endorsements(&self) -> u32 {
        self.endorsement_count.unwrap_or(0)
    }

    /// Centroid, dropping coordinates that fail the range sanity check.
    pub fn valid_centroid(&self) -> Option<Coordinate> {
        self.centroid.filter(Coordinate::is_valid)
    }

    pub fn is_public(&self) -> bool {
        !self.is_private
    }

    /// Projects this record to its cacheable snippet.
    pub fn snippet(&self) -> RecordSnippet {
        RecordSnippet {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
        }
    }
}

/// Minimal cached projection of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnippet {
    pub id: RecordId,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
}
