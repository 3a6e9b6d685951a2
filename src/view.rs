//! View controller: owns the store for one listing and serializes every
//! live, fetch and user event through it.

use crate::action::{Action, PageLoad};
use crate::batch::{batch_channel, BatchConfig, BatchSink};
use crate::channel::{ChannelEvent, TopicSubscription};
use crate::differ::DiffOptions;
use crate::feeds::FeedProfile;
use crate::loader::{Completion, PageLoader, PageSource, PendingRequest};
use crate::pagination::jump_target;
use crate::regions::{connect, standard_regions, Panel, SharedPanel};
use crate::render::MemoryTarget;
use crate::state::ListState;
use crate::store::ListStore;
use crate::types::{Candidate, Envelope};
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserCommand {
    /// Older page.
    Next,
    /// Newer page.
    Prev,
    Page(u32),
    Reload,
    /// Show the items held behind the overflow banner.
    ExpandOverflow,
    Quit,
}

impl FromStr for UserCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "n" | "next" | "older" => Ok(UserCommand::Next),
            "p" | "prev" | "newer" => Ok(UserCommand::Prev),
            "r" | "reload" | "retry" => Ok(UserCommand::Reload),
            "o" | "overflow" | "expand" => Ok(UserCommand::ExpandOverflow),
            "q" | "quit" | "exit" => Ok(UserCommand::Quit),
            other => match other.strip_prefix('g').unwrap_or(other).trim().parse::<u32>() {
                Ok(n) if n >= 1 => Ok(UserCommand::Page(n)),
                _ => Err(format!(
                    "unknown command `{other}` (n, p, <page>, r, o, q)"
                )),
            },
        }
    }
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum FeedEvent {
    /// A flushed live batch.
    Batch(Vec<Candidate>),
    Item(Candidate),
    Channel(ChannelEvent),
    PageFetched(Completion),
    Command(UserCommand),
}

pub type EventSender = UnboundedSender<FeedEvent>;

/// One listing page: store, regions, render tree and the live intake.
pub struct ListView<P: PageSource + ?Sized + 'static> {
    profile: FeedProfile,
    store: ListStore,
    loader: PageLoader<P>,
    target: Rc<RefCell<MemoryTarget>>,
    panel: SharedPanel,
    events: EventSender,
    batcher: Option<BatchSink<Candidate>>,
}

impl<P: PageSource + ?Sized + 'static> ListView<P> {
    /// Wire the regions and dispatch the initial `PAGE_LOAD`. Batched feeds
    /// spawn their intake task, so this must run inside a tokio runtime.
    pub fn new(
        profile: FeedProfile,
        context: PageLoad,
        source: Arc<P>,
        options: DiffOptions,
        batch: BatchConfig,
        events: EventSender,
    ) -> Self {
        let initial_items = context.items.clone();
        let mut store = ListStore::for_list(ListState::new(
            profile.settings.clone(),
            profile.pagination,
        ));
        let target = Rc::new(RefCell::new(MemoryTarget::new()));
        let panel: SharedPanel = Rc::new(RefCell::new(Panel::default()));
        connect(
            &mut store,
            standard_regions(
                context,
                Rc::clone(&target),
                Rc::clone(&panel),
                options,
                initial_items,
            ),
        );

        let batcher = profile.batched.then(|| {
            let tx = events.clone();
            batch_channel(batch, move |batch: Vec<Candidate>| {
                let _ = tx.send(FeedEvent::Batch(batch));
            })
        });

        Self {
            profile,
            store,
            loader: PageLoader::new(source),
            target,
            panel,
            events,
            batcher,
        }
    }

    pub fn state(&self) -> &ListState {
        self.store.state()
    }

    pub fn profile(&self) -> &FeedProfile {
        &self.profile
    }

    pub fn subscriptions(&self) -> Vec<TopicSubscription> {
        let topic = self
            .profile
            .topic_for(self.store.state().filter.address_hash.as_deref());
        vec![TopicSubscription::new(topic, self.profile.events)]
    }

    /// Fetch the first page unless it came with the page load.
    pub fn start(&mut self) {
        if self.store.state().items.is_empty() {
            let pending = self.loader.begin_first(&mut self.store);
            self.spawn_fetch(pending);
        }
    }

    /// Apply one event. Returns false once the view should close.
    pub fn handle(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Batch(items) => {
                log::debug!("📦 live batch of {}", items.len());
                self.store.dispatch(&Action::ReceivedBatch(items));
            }
            FeedEvent::Item(item) => {
                self.store.dispatch(&Action::ReceivedItem(item));
            }
            FeedEvent::Channel(ChannelEvent::Message(envelope)) => self.receive(envelope),
            FeedEvent::Channel(ChannelEvent::Joined(topic)) => {
                log::info!("📻 joined {topic}");
            }
            FeedEvent::Channel(ChannelEvent::Disconnected { topic, reason }) => {
                log::warn!("🔌 {topic} disconnected: {reason}");
                self.store.dispatch(&Action::ChannelDisconnected);
            }
            FeedEvent::PageFetched(completion) => {
                PageLoader::<P>::complete(&mut self.store, completion);
            }
            FeedEvent::Command(command) => return self.command(command),
        }
        self.target.borrow_mut().complete_transitions();
        true
    }

    /// Drain `rx` until it closes or a quit command arrives, calling
    /// `on_change` after every event.
    pub async fn run(
        mut self,
        mut rx: UnboundedReceiver<FeedEvent>,
        mut on_change: impl FnMut(&ListView<P>),
    ) {
        while let Some(event) = rx.recv().await {
            if !self.handle(event) {
                break;
            }
            on_change(&self);
        }
    }

    /// Panel lines followed by the rendered items.
    pub fn lines(&self) -> Vec<String> {
        let mut out = self.panel.borrow().lines();
        out.extend(
            self.target
                .borrow()
                .lines()
                .into_iter()
                .map(str::to_string),
        );
        out
    }

    pub fn panel(&self) -> Panel {
        self.panel.borrow().clone()
    }

    fn receive(&mut self, envelope: Envelope) {
        if !self.profile.events.contains(&envelope.event.as_str()) {
            return;
        }
        let item = match self.profile.decoder.decode_message(&envelope.payload) {
            Ok(item) => item,
            Err(e) => {
                log::warn!("⚠️ dropping {} message on {}: {e}", envelope.event, envelope.topic);
                return;
            }
        };
        match &self.batcher {
            Some(sink) => {
                if !sink.push(item) {
                    log::warn!("batch intake for {} is gone", self.profile.name);
                }
            }
            None => {
                self.store.dispatch(&Action::ReceivedItem(item));
            }
        }
    }

    fn command(&mut self, command: UserCommand) -> bool {
        let pending = match command {
            UserCommand::Next => self.loader.begin_next(&mut self.store),
            UserCommand::Prev => self.loader.begin_prev(&mut self.store),
            UserCommand::Page(n) => match jump_target(n, self.store.state()) {
                Some(n) => self.loader.begin_page(&mut self.store, n),
                None => None,
            },
            UserCommand::Reload => self.loader.begin_reload(&mut self.store),
            UserCommand::ExpandOverflow => {
                if self.store.state().overflow_count() == 0 {
                    return true;
                }
                self.store.dispatch(&Action::OverflowExpanded);
                self.loader.begin_first(&mut self.store)
            }
            UserCommand::Quit => return false,
        };
        if pending.is_none() {
            log::debug!("{command:?} ignored");
        }
        self.spawn_fetch(pending);
        true
    }

    fn spawn_fetch(&self, pending: Option<PendingRequest>) {
        let Some(pending) = pending else {
            return;
        };
        let source = self.loader.source();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let completion = PageLoader::fetch(source, pending).await;
            let _ = tx.send(FeedEvent::PageFetched(completion));
        });
    }
}
