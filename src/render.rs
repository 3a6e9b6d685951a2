//! In-memory render tree used by the CLI and by tests.

use crate::differ::{Placement, RenderTarget};
use crate::types::{Fragment, IdentityKey};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Entering,
    Present,
    Leaving,
}

/// Lifecycle callbacks fired as nodes enter and leave.
pub trait TransitionHooks {
    fn on_enter_start(&mut self, _key: &IdentityKey) {}
    fn on_enter_end(&mut self, _key: &IdentityKey) {}
    fn on_exit_start(&mut self, _key: &IdentityKey) {}
    fn on_exit_end(&mut self, _key: &IdentityKey) {}
}

#[derive(Debug, Default)]
pub struct NoopHooks;

impl TransitionHooks for NoopHooks {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub key: IdentityKey,
    pub content: Fragment,
    pub transition: Transition,
}

/// Visible slice of the list, in rows. One node is one row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub top: usize,
    pub height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            top: 0,
            height: usize::MAX,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTarget<H: TransitionHooks = NoopHooks> {
    nodes: Vec<Node>,
    viewport: Viewport,
    hooks: H,
}

impl MemoryTarget<NoopHooks> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: TransitionHooks> MemoryTarget<H> {
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            nodes: Vec::new(),
            viewport: Viewport::default(),
            hooks,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Contents of the nodes that are not leaving.
    pub fn lines(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.transition != Transition::Leaving)
            .map(|n| n.content.as_str())
            .collect()
    }

    /// Finish every running transition. Returns how many completed.
    pub fn complete_transitions(&mut self) -> usize {
        let mut completed = 0;
        for node in self.nodes.iter_mut() {
            if node.transition == Transition::Entering {
                node.transition = Transition::Present;
                self.hooks.on_enter_end(&node.key);
                completed += 1;
            }
        }
        let mut idx = 0;
        while idx < self.nodes.len() {
            if self.nodes[idx].transition == Transition::Leaving {
                let node = self.nodes.remove(idx);
                self.shift_for_removal(idx);
                self.hooks.on_exit_end(&node.key);
                completed += 1;
            } else {
                idx += 1;
            }
        }
        completed
    }

    fn index_of(&self, key: &IdentityKey) -> Option<usize> {
        self.nodes.iter().position(|n| &n.key == key)
    }

    fn anchor_index(&self, anchor: Option<&IdentityKey>) -> usize {
        anchor
            .and_then(|k| self.index_of(k))
            .unwrap_or(self.nodes.len())
    }

    // Rows removed above the viewport pull it up so visible rows stay put.
    fn shift_for_removal(&mut self, idx: usize) {
        if idx < self.viewport.top {
            self.viewport.top -= 1;
        }
    }
}

impl<H: TransitionHooks> RenderTarget for MemoryTarget<H> {
    fn live_keys(&self) -> Vec<IdentityKey> {
        self.nodes
            .iter()
            .filter(|n| n.transition != Transition::Leaving)
            .map(|n| n.key.clone())
            .collect()
    }

    fn is_leaving(&self, key: &IdentityKey) -> bool {
        self.nodes
            .iter()
            .any(|n| &n.key == key && n.transition == Transition::Leaving)
    }

    fn content(&self, key: &IdentityKey) -> Option<&Fragment> {
        self.nodes.iter().find(|n| &n.key == key).map(|n| &n.content)
    }

    fn insert(
        &mut self,
        key: IdentityKey,
        content: Fragment,
        anchor: Option<&IdentityKey>,
        placement: Placement,
    ) {
        let idx = self.anchor_index(anchor);
        let transition = match placement {
            Placement::Animated => {
                self.hooks.on_enter_start(&key);
                Transition::Entering
            }
            Placement::Instant => {
                if idx < self.viewport.top {
                    self.viewport.top += 1;
                }
                Transition::Present
            }
        };
        self.nodes.insert(
            idx,
            Node {
                key,
                content,
                transition,
            },
        );
    }

    fn patch(&mut self, key: &IdentityKey, content: Fragment) {
        if let Some(idx) = self.index_of(key) {
            self.nodes[idx].content = content;
        }
    }

    fn move_before(&mut self, key: &IdentityKey, anchor: Option<&IdentityKey>) {
        let Some(from) = self.index_of(key) else {
            return;
        };
        // Once scrolled, the first visible row stays put unless it is the one moving.
        let top = self.viewport.top;
        let first_visible = self
            .nodes
            .get(top)
            .map(|n| n.key.clone())
            .filter(|k| top > 0 && k != key);
        let node = self.nodes.remove(from);
        let to = self.anchor_index(anchor);
        self.nodes.insert(to, node);
        if let Some(idx) = first_visible.and_then(|k| self.index_of(&k)) {
            self.viewport.top = idx;
        }
    }

    fn remove(&mut self, key: &IdentityKey) {
        if let Some(idx) = self.index_of(key) {
            self.nodes.remove(idx);
            self.shift_for_removal(idx);
        }
    }

    fn begin_exit(&mut self, key: &IdentityKey) {
        if let Some(idx) = self.index_of(key) {
            if self.nodes[idx].transition != Transition::Leaving {
                self.nodes[idx].transition = Transition::Leaving;
                self.hooks.on_exit_start(key);
            }
        }
    }

    fn is_in_viewport(&self, anchor: Option<&IdentityKey>) -> bool {
        let idx = self.anchor_index(anchor);
        idx >= self.viewport.top && idx - self.viewport.top < self.viewport.height
    }
}
