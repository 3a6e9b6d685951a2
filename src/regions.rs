//! `{load, render}` bindings between the store and each part of a listing.

use crate::action::PageLoad;
use crate::differ::{diff, DiffOptions, RenderItem, RenderTarget};
use crate::pagination::{next_control, page_links, prev_control, Control, PageLink};
use crate::state::{ListState, Pagination};
use crate::store::{ListStore, Subscription};
use crate::types::{Candidate, Entry, Fragment, Rank};
use std::cell::RefCell;
use std::rc::Rc;

pub trait Region {
    /// Page context this region knows about at startup.
    fn load(&mut self) -> PageLoad {
        PageLoad::default()
    }

    fn render(&mut self, state: &ListState, old: &ListState);
}

/// Merge every region's `load`, subscribe their renders, then dispatch the
/// merged `PAGE_LOAD`.
pub fn connect(store: &mut ListStore, mut regions: Vec<Box<dyn Region>>) -> Subscription {
    let load = regions
        .iter_mut()
        .fold(PageLoad::default(), |acc, region| acc.merge(region.load()));
    let subscription = store.subscribe(move |state, old| {
        for region in regions.iter_mut() {
            region.render(state, old);
        }
    });
    store.dispatch(&crate::action::Action::PageLoad(load));
    subscription
}

/// Static page context: listing path, address, filter, initial cursor.
pub struct ContextRegion {
    load: PageLoad,
}

impl ContextRegion {
    pub fn new(load: PageLoad) -> Self {
        Self { load }
    }
}

impl Region for ContextRegion {
    fn load(&mut self) -> PageLoad {
        self.load.clone()
    }

    fn render(&mut self, _state: &ListState, _old: &ListState) {}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Hidden,
    Loading,
    Error(String),
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginationView {
    pub prev: Control,
    pub next: Control,
    /// Indexed listings only.
    pub links: Vec<PageLink>,
}

impl Default for PaginationView {
    fn default() -> Self {
        Self {
            prev: Control::Hidden,
            next: Control::Hidden,
            links: Vec::new(),
        }
    }
}

/// Everything around the list itself, as the regions last rendered it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Panel {
    pub status: Status,
    pub overflow: usize,
    pub pagination: PaginationView,
    pub disconnected: bool,
    pub item_count: Option<u64>,
    pub validation_count: Option<u64>,
}

impl Panel {
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.disconnected {
            out.push("Connection lost, reload the page to see new items.".to_string());
        }
        if self.overflow > 0 {
            out.push(format!(
                "{} more item(s) have come in, press `o` to load the newest.",
                self.overflow
            ));
        }
        match &self.status {
            Status::Hidden => {}
            Status::Loading => out.push("Loading...".to_string()),
            Status::Error(e) => {
                out.push(format!("Something went wrong ({e}), press `r` to retry."))
            }
            Status::Empty => out.push("There are no items.".to_string()),
        }
        if let Some(count) = self.item_count {
            out.push(format!("{count} items"));
        }
        if let Some(count) = self.validation_count {
            out.push(format!("{count} blocks validated"));
        }
        let mut nav = Vec::new();
        if self.pagination.prev != Control::Hidden {
            nav.push(control_label("< newer", self.pagination.prev));
        }
        nav.extend(self.pagination.links.iter().map(PageLink::label));
        if self.pagination.next != Control::Hidden {
            nav.push(control_label("older >", self.pagination.next));
        }
        if !nav.is_empty() {
            out.push(nav.join(" "));
        }
        out
    }
}

fn control_label(label: &str, control: Control) -> String {
    match control {
        Control::Disabled => format!("({label})"),
        _ => label.to_string(),
    }
}

pub type SharedPanel = Rc<RefCell<Panel>>;

pub fn placeholder_fragment(rank: Rank) -> Fragment {
    Fragment::new(format!(
        "<div data-selector=\"place-holder\" data-block-number=\"{rank}\">Block Processing {rank}</div>"
    ))
}

/// The list itself, projected onto a render target through the differ.
pub struct ItemsRegion<T: RenderTarget> {
    target: Rc<RefCell<T>>,
    options: DiffOptions,
    initial: Option<Vec<Candidate>>,
    placeholder: fn(Rank) -> Fragment,
}

impl<T: RenderTarget> ItemsRegion<T> {
    pub fn new(target: Rc<RefCell<T>>, options: DiffOptions) -> Self {
        Self {
            target,
            options,
            initial: None,
            placeholder: placeholder_fragment,
        }
    }

    /// Server-rendered items to seed the list with.
    pub fn with_initial(mut self, items: Vec<Candidate>) -> Self {
        self.initial = Some(items);
        self
    }

    pub fn with_placeholder(mut self, placeholder: fn(Rank) -> Fragment) -> Self {
        self.placeholder = placeholder;
        self
    }

    fn desired(&self, items: &[Entry]) -> Vec<RenderItem> {
        items
            .iter()
            .map(|entry| RenderItem {
                key: entry.identity(),
                content: match entry {
                    Entry::Real(e) => e.payload.clone(),
                    Entry::Placeholder(rank) => (self.placeholder)(*rank),
                },
            })
            .collect()
    }
}

impl<T: RenderTarget> Region for ItemsRegion<T> {
    fn load(&mut self) -> PageLoad {
        PageLoad {
            items: self.initial.take(),
            ..PageLoad::default()
        }
    }

    fn render(&mut self, state: &ListState, old: &ListState) {
        if state.items == old.items {
            return;
        }
        let desired = self.desired(&state.items);
        let report = diff(&mut *self.target.borrow_mut(), &desired, self.options);
        log::debug!("rendered {} item(s): {report:?}", desired.len());
    }
}

/// Loading, error and empty messages.
pub struct StatusRegion {
    panel: SharedPanel,
}

impl StatusRegion {
    pub fn new(panel: SharedPanel) -> Self {
        Self { panel }
    }
}

impl Region for StatusRegion {
    fn render(&mut self, state: &ListState, _old: &ListState) {
        let status = if state.request.is_loading() {
            Status::Loading
        } else if let Some(e) = &state.request.error {
            Status::Error(e.clone())
        } else if state.items.is_empty() {
            Status::Empty
        } else {
            Status::Hidden
        };
        self.panel.borrow_mut().status = status;
    }
}

/// "N more available" banner.
pub struct OverflowRegion {
    panel: SharedPanel,
}

impl OverflowRegion {
    pub fn new(panel: SharedPanel) -> Self {
        Self { panel }
    }
}

impl Region for OverflowRegion {
    fn render(&mut self, state: &ListState, old: &ListState) {
        if state.overflow_count() == old.overflow_count() {
            return;
        }
        self.panel.borrow_mut().overflow = state.overflow_count();
    }
}

pub struct PaginationRegion {
    panel: SharedPanel,
}

impl PaginationRegion {
    pub fn new(panel: SharedPanel) -> Self {
        Self { panel }
    }
}

impl Region for PaginationRegion {
    fn render(&mut self, state: &ListState, old: &ListState) {
        let unchanged = state.pagination == old.pagination
            && state.request == old.request
            && state.empty_response == old.empty_response
            && state.beyond_page_one == old.beyond_page_one;
        if unchanged {
            return;
        }
        let links = match &state.pagination {
            Pagination::Indexed {
                page_number,
                pages_limit,
                ..
            } if !state.empty_response => {
                page_links(*pages_limit, *page_number, state.request.is_loading())
            }
            _ => Vec::new(),
        };
        self.panel.borrow_mut().pagination = PaginationView {
            prev: prev_control(state),
            next: next_control(state),
            links,
        };
    }
}

pub struct DisconnectRegion {
    panel: SharedPanel,
}

impl DisconnectRegion {
    pub fn new(panel: SharedPanel) -> Self {
        Self { panel }
    }
}

impl Region for DisconnectRegion {
    fn render(&mut self, state: &ListState, _old: &ListState) {
        self.panel.borrow_mut().disconnected = state.channel_disconnected && !state.beyond_page_one;
    }
}

/// Item and validation counters.
pub struct CounterRegion {
    panel: SharedPanel,
    initial: PageLoad,
}

impl CounterRegion {
    pub fn new(panel: SharedPanel) -> Self {
        Self {
            panel,
            initial: PageLoad::default(),
        }
    }

    pub fn with_counts(mut self, item_count: Option<u64>, validation_count: Option<u64>) -> Self {
        self.initial.item_count = item_count;
        self.initial.validation_count = validation_count;
        self
    }
}

impl Region for CounterRegion {
    fn load(&mut self) -> PageLoad {
        std::mem::take(&mut self.initial)
    }

    fn render(&mut self, state: &ListState, old: &ListState) {
        if state.item_count == old.item_count && state.validation_count == old.validation_count {
            return;
        }
        let mut panel = self.panel.borrow_mut();
        panel.item_count = state.item_count;
        panel.validation_count = state.validation_count;
    }
}

/// Every region a listing page uses, wired to one panel and one target.
pub fn standard_regions<T: RenderTarget + 'static>(
    context: PageLoad,
    target: Rc<RefCell<T>>,
    panel: SharedPanel,
    options: DiffOptions,
    initial_items: Option<Vec<Candidate>>,
) -> Vec<Box<dyn Region>> {
    let mut items = ItemsRegion::new(target, options);
    if let Some(initial) = initial_items {
        items = items.with_initial(initial);
    }
    vec![
        Box::new(ContextRegion::new(context)),
        Box::new(items),
        Box::new(StatusRegion::new(Rc::clone(&panel))),
        Box::new(OverflowRegion::new(Rc::clone(&panel))),
        Box::new(PaginationRegion::new(Rc::clone(&panel))),
        Box::new(DisconnectRegion::new(Rc::clone(&panel))),
        Box::new(CounterRegion::new(panel)),
    ]
}
