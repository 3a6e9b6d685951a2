//! Page loader: request lifecycle plus cursor and indexed navigation.
//!
//! Every request is split into `begin_*` (synchronous dispatches against the
//! store, returns what to fetch), [`PageLoader::fetch`] (async, touches no
//! state) and [`PageLoader::complete`] (dispatches the outcome). The view
//! controller runs the fetch on a task and feeds the completion back as an
//! event; tests can drive the three steps inline.

use crate::action::{Action, FetchedPage, PageTarget};
use crate::error::FetchError;
use crate::state::Pagination;
use crate::store::ListStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What to fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Listing path, or an opaque next-page path in cursor mode.
    pub path: String,
    /// Set for indexed listings.
    pub page_number: Option<u32>,
    /// Cached server paging params echoed back on indexed requests.
    pub params: BTreeMap<String, String>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub generation: u64,
    pub request: PageRequest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub generation: u64,
    pub result: Result<FetchedPage, FetchError>,
}

pub struct PageLoader<P: ?Sized> {
    source: Arc<P>,
}

impl<P: ?Sized> Clone for PageLoader<P> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<P: PageSource + ?Sized> PageLoader<P> {
    pub fn new(source: Arc<P>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Arc<P> {
        Arc::clone(&self.source)
    }

    /// Initial fetch of the listing: its path, or page 1.
    pub fn begin_first(&self, store: &mut ListStore) -> Option<PendingRequest> {
        match store.state().pagination.mode() {
            crate::state::PaginationMode::Cursor => {
                let path = store.state().listing_path.clone()?;
                Some(start(store, PageTarget::Path(path.clone()), request_for(path)))
            }
            crate::state::PaginationMode::Indexed => self.begin_page(store, 1),
        }
    }

    /// Older page.
    pub fn begin_next(&self, store: &mut ListStore) -> Option<PendingRequest> {
        let state = store.state();
        if state.request.is_loading() {
            return None;
        }
        match &state.pagination {
            Pagination::Cursor { next_page_path, .. } => {
                let path = next_page_path.clone()?;
                store.dispatch(&Action::NavigateToOlder);
                Some(start(store, PageTarget::Path(path.clone()), request_for(path)))
            }
            Pagination::Indexed {
                page_number,
                pages_limit,
                ..
            } => {
                let next = page_number + 1;
                if *page_number >= 1 && next > *pages_limit {
                    return None;
                }
                self.begin_page(store, next)
            }
        }
    }

    /// Newer page.
    pub fn begin_prev(&self, store: &mut ListStore) -> Option<PendingRequest> {
        let state = store.state();
        if state.request.is_loading() {
            return None;
        }
        match &state.pagination {
            Pagination::Cursor { prev_page_path, .. } => {
                let path = prev_page_path.clone()?;
                store.dispatch(&Action::NavigateToNewer);
                Some(start(store, PageTarget::Path(path.clone()), request_for(path)))
            }
            Pagination::Indexed { page_number, .. } => {
                if *page_number <= 1 {
                    return None;
                }
                let prev = page_number - 1;
                self.begin_page(store, prev)
            }
        }
    }

    /// Jump to page `number` of an indexed listing.
    pub fn begin_page(&self, store: &mut ListStore, number: u32) -> Option<PendingRequest> {
        let state = store.state();
        let Pagination::Indexed { params, .. } = &state.pagination else {
            return None;
        };
        if number == 0 {
            return None;
        }
        let request = PageRequest {
            path: state.listing_path.clone()?,
            page_number: Some(number),
            params: params.clone(),
        };
        Some(start(store, PageTarget::Number(number), request))
    }

    /// Fetch the page currently shown again.
    pub fn begin_reload(&self, store: &mut ListStore) -> Option<PendingRequest> {
        let state = store.state();
        match &state.pagination {
            Pagination::Cursor { .. } => {
                let path = state
                    .current_page_path
                    .clone()
                    .or_else(|| state.listing_path.clone())?;
                Some(start(store, PageTarget::Path(path.clone()), request_for(path)))
            }
            Pagination::Indexed { page_number, .. } => {
                let page = (*page_number).max(1);
                self.begin_page(store, page)
            }
        }
    }

    /// Run the fetch for `pending`. Touches no state.
    pub async fn fetch(source: Arc<P>, pending: PendingRequest) -> Completion {
        log::debug!(
            "📡 fetching {} (generation {})",
            pending.request.path,
            pending.generation
        );
        let result = source.fetch(&pending.request).await;
        if let Err(e) = &result {
            log::warn!("⚠️ page fetch failed: {e}");
        }
        Completion {
            generation: pending.generation,
            result,
        }
    }

    /// Dispatch the outcome of a fetch, then `FINISH_REQUEST`.
    pub fn complete(store: &mut ListStore, completion: Completion) {
        let generation = completion.generation;
        let action = match completion.result {
            Ok(page) => Action::ItemsFetched { generation, page },
            Err(e) => Action::RequestError {
                generation,
                message: e.to_string(),
            },
        };
        store.dispatch(&action);
        store.dispatch(&Action::FinishRequest { generation });
    }

    async fn run(&self, store: &mut ListStore, pending: Option<PendingRequest>) -> bool {
        let Some(pending) = pending else {
            return false;
        };
        let completion = Self::fetch(self.source(), pending).await;
        Self::complete(store, completion);
        true
    }

    pub async fn first_load(&self, store: &mut ListStore) -> bool {
        let pending = self.begin_first(store);
        self.run(store, pending).await
    }

    pub async fn load_next(&self, store: &mut ListStore) -> bool {
        let pending = self.begin_next(store);
        self.run(store, pending).await
    }

    pub async fn load_prev(&self, store: &mut ListStore) -> bool {
        let pending = self.begin_prev(store);
        self.run(store, pending).await
    }

    pub async fn load_page(&self, store: &mut ListStore, number: u32) -> bool {
        let pending = self.begin_page(store, number);
        self.run(store, pending).await
    }

    pub async fn reload(&self, store: &mut ListStore) -> bool {
        let pending = self.begin_reload(store);
        self.run(store, pending).await
    }
}

fn request_for(path: String) -> PageRequest {
    PageRequest {
        path,
        ..PageRequest::default()
    }
}

fn start(store: &mut ListStore, target: PageTarget, request: PageRequest) -> PendingRequest {
    let generation = store.state().request.generation + 1;
    store.dispatch(&Action::StartRequest { generation, target });
    PendingRequest {
        generation,
        request,
    }
}
