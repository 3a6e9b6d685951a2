use crate::filter::FilterContext;
use crate::types::{Entity, Entry, IdentityKey, Rank};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How a feed orders its items.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrder {
    /// Server-provided rank (block height); gaps are filled with placeholders.
    Ranked,
    /// Arrival order; the reducer assigns a sequence as the rank.
    Stream,
}

/// Which page counter live arrivals advance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    #[default]
    Items,
    Validations,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    Cursor,
    Indexed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedSettings {
    pub order: FeedOrder,
    /// Maximum visible entries (`W`).
    pub window: usize,
    /// Batches at or above this size go to overflow. `None` merges every batch.
    pub batch_threshold: Option<usize>,
    pub counter: Counter,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            order: FeedOrder::Stream,
            window: 50,
            batch_threshold: Some(10),
            counter: Counter::Items,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pagination {
    Cursor {
        next_page_path: Option<String>,
        prev_page_path: Option<String>,
        /// Visited page paths; the top is the page currently shown once the
        /// user has moved past page one.
        pages_stack: Vec<String>,
    },
    Indexed {
        /// 0 until the first page arrives.
        page_number: u32,
        pages_limit: u32,
        /// Server paging params echoed back on every request.
        params: BTreeMap<String, String>,
    },
}

impl Pagination {
    pub fn new(mode: PaginationMode) -> Self {
        match mode {
            PaginationMode::Cursor => Pagination::Cursor {
                next_page_path: None,
                prev_page_path: None,
                pages_stack: Vec::new(),
            },
            PaginationMode::Indexed => Pagination::Indexed {
                page_number: 0,
                pages_limit: 1,
                params: BTreeMap::new(),
            },
        }
    }

    pub fn mode(&self) -> PaginationMode {
        match self {
            Pagination::Cursor { .. } => PaginationMode::Cursor,
            Pagination::Indexed { .. } => PaginationMode::Indexed,
        }
    }

    pub fn has_next(&self) -> bool {
        match self {
            Pagination::Cursor { next_page_path, .. } => next_page_path.is_some(),
            Pagination::Indexed {
                page_number,
                pages_limit,
                ..
            } => page_number < pages_limit,
        }
    }

    pub fn has_prev(&self) -> bool {
        match self {
            Pagination::Cursor { prev_page_path, .. } => prev_page_path.is_some(),
            Pagination::Indexed { page_number, .. } => *page_number > 1,
        }
    }
}

/// `idle → loading → {loaded, errored} → idle`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestState {
    pub phase: RequestPhase,
    /// Generation of the request whose response may still be applied.
    pub generation: u64,
    pub error: Option<String>,
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        self.phase == RequestPhase::Loading
    }
}

/// Where the list stood before a request moved it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PagePosition {
    pagination: Pagination,
    beyond_page_one: bool,
    current_page_path: Option<String>,
}

/// Canonical per-view list state. Mutated only by [`crate::reducer::reduce`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListState {
    pub settings: FeedSettings,
    pub items: Vec<Entry>,
    pub filter: FilterContext,
    pub channel_disconnected: bool,
    /// Keys of live items held back behind the "N more available" banner.
    pub overflow: HashSet<IdentityKey>,
    pub beyond_page_one: bool,
    pub listing_path: Option<String>,
    pub current_page_path: Option<String>,
    pub pagination: Pagination,
    pub request: RequestState,
    pub empty_response: bool,
    pub item_count: Option<u64>,
    pub validation_count: Option<u64>,
    pub(crate) next_seq: Rank,
    /// Restored if the in-flight request fails.
    pub(crate) pending_position: Option<PagePosition>,
}

impl ListState {
    pub fn new(settings: FeedSettings, mode: PaginationMode) -> Self {
        Self {
            settings,
            items: Vec::new(),
            filter: FilterContext::default(),
            channel_disconnected: false,
            overflow: HashSet::new(),
            beyond_page_one: false,
            listing_path: None,
            current_page_path: None,
            pagination: Pagination::new(mode),
            request: RequestState::default(),
            empty_response: false,
            item_count: None,
            validation_count: None,
            next_seq: 0,
            pending_position: None,
        }
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow.len()
    }

    /// Remember the current position unless a request already did.
    pub(crate) fn hold_position(&mut self) {
        if self.pending_position.is_none() {
            self.pending_position = Some(PagePosition {
                pagination: self.pagination.clone(),
                beyond_page_one: self.beyond_page_one,
                current_page_path: self.current_page_path.clone(),
            });
        }
    }

    /// Undo navigation made for a request that failed.
    pub(crate) fn restore_position(&mut self) {
        if let Some(position) = self.pending_position.take() {
            self.pagination = position.pagination;
            self.beyond_page_one = position.beyond_page_one;
            self.current_page_path = position.current_page_path;
        }
    }

    /// Live items may still change the visible list.
    pub fn accepts_live_items(&self) -> bool {
        !self.channel_disconnected && !self.beyond_page_one
    }

    pub fn page_number(&self) -> Option<u32> {
        match &self.pagination {
            Pagination::Indexed { page_number, .. } => Some(*page_number),
            Pagination::Cursor { .. } => None,
        }
    }

    pub fn pages_limit(&self) -> Option<u32> {
        match &self.pagination {
            Pagination::Indexed { pages_limit, .. } => Some(*pages_limit),
            Pagination::Cursor { .. } => None,
        }
    }

    pub fn real_items(&self) -> impl Iterator<Item = &Entity> {
        self.items.iter().filter_map(Entry::entity)
    }
}
