//! Discovery feed sources, ranking and orchestration.
//!
//! # Responsibility
//! - Fetch and rank each feed section from the record source.
//! - Coordinate concurrent section loads into one [`state::FeedState`].
//!
//! # Invariants
//! - Private records never reach a feed output.
//! - Sections load and fail independently.

pub mod endorsed;
pub mod main_feature;
pub mod nearby;
pub mod orchestrator;
pub mod paginated;
pub mod state;

pub use endorsed::fetch_recently_endorsed;
pub use nearby::{fetch_nearby, RankedRecord};
pub use orchestrator::{FeedOrchestrator, NearbyPhase};
pub use paginated::{ListKind, Page};
pub use state::{
    FeedEntry, FeedEvent, FeedSection, FeedSlot, FeedState, LoadStatus, NearbySource,
};
