//! Feed tunables.
//!
//! # Responsibility
//! - Carry every size, radius and window constant used by the feed.
//! - Accept partial JSON overrides on top of defaults.
//!
//! # Invariants
//! - A config that passed [`FeedConfig::validate`] has positive sizes,
//!   a positive finite radius and a positive cache window.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Six hours in milliseconds.
pub const DEFAULT_CACHE_WINDOW_MS: i64 = 6 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Candidate pool size for the main highlighted record.
    pub main_candidate_limit: u32,
    /// Minimum endorsements for a main-slot candidate.
    pub main_min_endorsements: u32,
    /// Endorsement events fetched per load.
    pub endorsed_fetch_limit: u32,
    pub endorsed_display_count: usize,
    pub nearby_radius_miles: f64,
    pub nearby_display_count: usize,
    /// Freshness window length for nearby cache entries.
    pub cache_window_ms: i64,
    /// Smallest ranked list that is written to, and trusted from, the cache.
    pub min_cache_records: usize,
    /// Number of score windows (current included) considered trending.
    pub trending_time_blocks: u32,
    /// Score window length for trending.
    pub trending_window_ms: i64,
    pub page_size: u32,
    pub trending_first_page_size: u32,
    pub recent_first_page_size: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            main_candidate_limit: 10,
            main_min_endorsements: 5,
            endorsed_fetch_limit: 10,
            endorsed_display_count: 3,
            nearby_radius_miles: 20.0,
            nearby_display_count: 3,
            cache_window_ms: DEFAULT_CACHE_WINDOW_MS,
            min_cache_records: 10,
            trending_time_blocks: 5,
            trending_window_ms: DEFAULT_CACHE_WINDOW_MS,
            page_size: 3,
            trending_first_page_size: 3,
            recent_first_page_size: 6,
        }
    }
}

impl FeedConfig {
    /// Parses a JSON object of overrides; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("main_candidate_limit", self.main_candidate_limit as usize),
            ("endorsed_fetch_limit", self.endorsed_fetch_limit as usize),
            ("endorsed_display_count", self.endorsed_display_count),
            ("nearby_display_count", self.nearby_display_count),
            ("trending_time_blocks", self.trending_time_blocks as usize),
            ("page_size", self.page_size as usize),
            ("trending_first_page_size", self.trending_first_page_size as usize),
            ("recent_first_page_size", self.recent_first_page_size as usize),
        ];
        if let Some(&(name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NonPositive(name));
        }

        if !self.nearby_radius_miles.is_finite() || self.nearby_radius_miles <= 0.0 {
            return Err(ConfigError::NonPositive("nearby_radius_miles"));
        }
        if self.cache_window_ms <= 0 {
            return Err(ConfigError::NonPositive("cache_window_ms"));
        }
        if self.trending_window_ms <= 0 {
            return Err(ConfigError::NonPositive("trending_window_ms"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    NonPositive(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid feed config: {message}"),
            Self::NonPositive(field) => write!(f, "feed config `{field}` must be positive"),
        }
    }
}

impl Error for ConfigError {}
