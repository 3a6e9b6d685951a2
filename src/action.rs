use crate::filter::FilterMode;
use crate::types::Candidate;
use std::collections::BTreeMap;

/// Every way the list state can change. One variant per action kind; the
/// reducer matches exhaustively.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// View context and server-rendered snapshot. Also advances the request
    /// generation so responses from a previous context are discarded.
    PageLoad(PageLoad),
    StartRequest {
        generation: u64,
        target: PageTarget,
    },
    ItemsFetched {
        generation: u64,
        page: FetchedPage,
    },
    RequestError {
        generation: u64,
        message: String,
    },
    FinishRequest {
        generation: u64,
    },
    /// One unbatched live message.
    ReceivedItem(Candidate),
    /// One flush of the batcher, in arrival order.
    ReceivedBatch(Vec<Candidate>),
    ChannelDisconnected,
    NavigateToOlder,
    NavigateToNewer,
    /// User asked to see the held-back items; the view reloads page one.
    OverflowExpanded,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::PageLoad(_) => "PAGE_LOAD",
            Action::StartRequest { .. } => "START_REQUEST",
            Action::ItemsFetched { .. } => "ITEMS_FETCHED",
            Action::RequestError { .. } => "REQUEST_ERROR",
            Action::FinishRequest { .. } => "FINISH_REQUEST",
            Action::ReceivedItem(_) => "RECEIVED_ITEM",
            Action::ReceivedBatch(_) => "RECEIVED_BATCH",
            Action::ChannelDisconnected => "CHANNEL_DISCONNECTED",
            Action::NavigateToOlder => "NAVIGATE_TO_OLDER",
            Action::NavigateToNewer => "NAVIGATE_TO_NEWER",
            Action::OverflowExpanded => "OVERFLOW_EXPANDED",
        }
    }
}

/// Partial page context. Regions each contribute the fields they know and
/// the results are merged before dispatch; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageLoad {
    pub listing_path: Option<String>,
    pub address_hash: Option<String>,
    pub filter: Option<FilterMode>,
    pub beyond_page_one: Option<bool>,
    pub items: Option<Vec<Candidate>>,
    pub next_page_path: Option<String>,
    pub item_count: Option<u64>,
    pub validation_count: Option<u64>,
}

impl PageLoad {
    /// Fields set in `other` win.
    pub fn merge(mut self, other: PageLoad) -> PageLoad {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )*
            };
        }
        take!(
            listing_path,
            address_hash,
            filter,
            beyond_page_one,
            items,
            next_page_path,
            item_count,
            validation_count
        );
        self
    }
}

/// What a `START_REQUEST` is about to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageTarget {
    /// Opaque continuation path (cursor mode), or the listing path itself.
    Path(String),
    /// Explicit page of an indexed listing.
    Number(u32),
}

/// Decoded page response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchedPage {
    pub items: Vec<Candidate>,
    pub next_page_path: Option<String>,
    pub next_page_params: Option<PageParams>,
}

/// Indexed paging params returned by the server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageParams {
    pub page_number: u32,
    pub pages_limit: u32,
    /// Every other param, echoed back on the next request.
    pub rest: BTreeMap<String, String>,
}
