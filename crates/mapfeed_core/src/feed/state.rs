//! Feed presentation state and its reducer.
//!
//! # Responsibility
//! - Hold per-section slot contents and load status for one feed load.
//! - Apply load events as pure transitions.
//!
//! # Invariants
//! - Each section transitions independently; no event touches another
//!   section's status.
//! - `shown_ids` lists every displayed record id once, in arrival order.
//!   It is informational and never filters slot contents.

use crate::feed::paginated::{ListKind, Page};
use crate::model::record::{Record, RecordId, RecordSnippet};
use crate::repo::PageCursor;

/// Load status of one feed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Remote failure; slots render as placeholders.
    Failed,
    /// Section is not loaded for this visitor (no reference location).
    Disabled,
}

/// Feed sections that load independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSection {
    Main,
    Endorsed,
    Nearby,
    Trending,
    Recent,
}

/// Addressable single-entry slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSlot {
    Main,
    Endorsed(usize),
    Nearby(usize),
}

/// Where a nearby result list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearbySource {
    Cache,
    Remote,
}

/// Slot content: a full record, or a cached snippet to be hydrated by the
/// presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry {
    Record(Record),
    Snippet(RecordSnippet),
}

impl FeedEntry {
    pub fn id(&self) -> &str {
        match self {
            Self::Record(record) => &record.id,
            Self::Snippet(snippet) => &snippet.id,
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            Self::Record(record) => &record.owner_id,
            Self::Snippet(snippet) => &snippet.owner_id,
        }
    }
}

/// Fixed-size group of slots sharing one load status.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotGroup {
    pub status: LoadStatus,
    pub entries: Vec<FeedEntry>,
}

impl SlotGroup {
    /// Entry at `index`, or `None` for a placeholder.
    pub fn get(&self, index: usize) -> Option<&FeedEntry> {
        self.entries.get(index)
    }
}

/// Paginated list accumulated across pages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PagedList {
    pub status: LoadStatus,
    pub records: Vec<Record>,
    pub next_cursor: Option<PageCursor>,
}

impl PagedList {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    fn append(&mut self, page: Page) {
        self.records.extend(page.records);
        self.next_cursor = page.next_cursor;
        self.status = LoadStatus::Ready;
    }
}

/// Outcome of one independent sub-load.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// All enabled sections start loading.
    LoadStarted { nearby_enabled: bool },
    MainLoaded(Option<Record>),
    EndorsedLoaded(Vec<Record>),
    NearbyLoaded {
        entries: Vec<FeedEntry>,
        source: NearbySource,
    },
    PageLoaded(Page),
    Failed { section: FeedSection, message: String },
}

/// Whole-feed state for one load cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedState {
    pub main: SlotGroup,
    pub endorsed: SlotGroup,
    pub nearby: SlotGroup,
    pub nearby_source: Option<NearbySource>,
    pub trending: PagedList,
    pub recent: PagedList,
    pub shown_ids: Vec<RecordId>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next state after `event`.
    pub fn apply(mut self, event: FeedEvent) -> Self {
        match event {
            FeedEvent::LoadStarted { nearby_enabled } => {
                self.main.status = LoadStatus::Loading;
                self.endorsed.status = LoadStatus::Loading;
                self.trending.status = LoadStatus::Loading;
                self.recent.status = LoadStatus::Loading;
                self.nearby.status = if nearby_enabled {
                    LoadStatus::Loading
                } else {
                    LoadStatus::Disabled
                };
            }
            FeedEvent::MainLoaded(record) => {
                self.main = SlotGroup {
                    status: LoadStatus::Ready,
                    entries: record.into_iter().map(FeedEntry::Record).collect(),
                };
                self.mark_shown_group(FeedSection::Main);
            }
            FeedEvent::EndorsedLoaded(records) => {
                self.endorsed = SlotGroup {
                    status: LoadStatus::Ready,
                    entries: records.into_iter().map(FeedEntry::Record).collect(),
                };
                self.mark_shown_group(FeedSection::Endorsed);
            }
            FeedEvent::NearbyLoaded { entries, source } => {
                self.nearby = SlotGroup {
                    status: LoadStatus::Ready,
                    entries,
                };
                self.nearby_source = Some(source);
                self.mark_shown_group(FeedSection::Nearby);
            }
            FeedEvent::PageLoaded(page) => match page.kind {
                ListKind::Trending => self.trending.append(page),
                ListKind::Recent => self.recent.append(page),
            },
            FeedEvent::Failed { section, .. } => match section {
                FeedSection::Main => self.main.status = LoadStatus::Failed,
                FeedSection::Endorsed => self.endorsed.status = LoadStatus::Failed,
                FeedSection::Nearby => self.nearby.status = LoadStatus::Failed,
                FeedSection::Trending => self.trending.status = LoadStatus::Failed,
                FeedSection::Recent => self.recent.status = LoadStatus::Failed,
            },
        }
        self
    }

    /// Entry shown in `slot`, `None` for a placeholder.
    pub fn slot(&self, slot: FeedSlot) -> Option<&FeedEntry> {
        match slot {
            FeedSlot::Main => self.main.get(0),
            FeedSlot::Endorsed(index) => self.endorsed.get(index),
            FeedSlot::Nearby(index) => self.nearby.get(index),
        }
    }

    /// Nearby finished and found nothing to show.
    pub fn none_nearby(&self) -> bool {
        self.nearby.status == LoadStatus::Ready && self.nearby.entries.is_empty()
    }

    /// Whether every enabled section has left the loading state.
    pub fn is_settled(&self) -> bool {
        [
            self.main.status,
            self.endorsed.status,
            self.nearby.status,
            self.trending.status,
            self.recent.status,
        ]
        .iter()
        .all(|status| !matches!(status, LoadStatus::Loading))
    }

    fn mark_shown_group(&mut self, section: FeedSection) {
        let group = match section {
            FeedSection::Main => &self.main,
            FeedSection::Endorsed => &self.endorsed,
            FeedSection::Nearby => &self.nearby,
            FeedSection::Trending | FeedSection::Recent => return,
        };
        for entry in &group.entries {
            if !self.shown_ids.iter().any(|id| id == entry.id()) {
                self.shown_ids.push(entry.id().to_string());
            }
        }
    }
}
