//! Identity-keyed reconciliation of a rendered list against a desired one.

use crate::types::{Fragment, IdentityKey};
use std::collections::{HashMap, HashSet};

/// One desired row: its identity and the fragment to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderItem {
    pub key: IdentityKey,
    pub content: Fragment,
}

impl RenderItem {
    pub fn new(key: impl Into<IdentityKey>, content: impl Into<Fragment>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffOptions {
    pub animate: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Slide in through an entering transition.
    Animated,
    /// Appear immediately; the target keeps the scroll position stable.
    Instant,
}

/// Mutation surface the differ drives. Keys are unique among nodes.
pub trait RenderTarget {
    /// Keys of nodes that are not leaving, in document order.
    fn live_keys(&self) -> Vec<IdentityKey>;
    fn is_leaving(&self, key: &IdentityKey) -> bool;
    fn content(&self, key: &IdentityKey) -> Option<&Fragment>;
    /// Insert before `anchor`, or append when `anchor` is `None`.
    fn insert(
        &mut self,
        key: IdentityKey,
        content: Fragment,
        anchor: Option<&IdentityKey>,
        placement: Placement,
    );
    fn patch(&mut self, key: &IdentityKey, content: Fragment);
    fn move_before(&mut self, key: &IdentityKey, anchor: Option<&IdentityKey>);
    /// Detach immediately, leaving or not.
    fn remove(&mut self, key: &IdentityKey);
    /// Start an exit transition; the node is removed when it completes.
    fn begin_exit(&mut self, key: &IdentityKey);
    /// Whether a node inserted before `anchor` would be visible.
    fn is_in_viewport(&self, anchor: Option<&IdentityKey>) -> bool;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub inserted: usize,
    pub removed: usize,
    pub patched: usize,
    pub moved: usize,
}

impl DiffReport {
    pub fn is_noop(&self) -> bool {
        *self == DiffReport::default()
    }
}

/// Bring `target` in line with `desired`: final live order equals desired
/// order, unchanged content is never patched and nodes already in relative
/// order are never moved.
pub fn diff<T: RenderTarget + ?Sized>(
    target: &mut T,
    desired: &[RenderItem],
    options: DiffOptions,
) -> DiffReport {
    let mut report = DiffReport::default();

    let mut seen = HashSet::with_capacity(desired.len());
    let desired: Vec<&RenderItem> = desired
        .iter()
        .filter(|item| {
            let fresh = seen.insert(item.key.clone());
            if !fresh {
                log::warn!("duplicate identity {} in desired list", item.key);
            }
            fresh
        })
        .collect();

    let live = target.live_keys();
    let position: HashMap<&IdentityKey, usize> =
        live.iter().enumerate().map(|(i, k)| (k, i)).collect();

    for key in live.iter().filter(|k| !seen.contains(*k)) {
        if options.animate {
            target.begin_exit(key);
        } else {
            target.remove(key);
        }
        report.removed += 1;
    }

    // A desired key still fading out must come back as a fresh node.
    for item in &desired {
        if !position.contains_key(&item.key) && target.is_leaving(&item.key) {
            target.remove(&item.key);
        }
    }

    // Current positions of kept nodes, in desired order.
    let kept: Vec<Option<usize>> = desired
        .iter()
        .map(|item| position.get(&item.key).copied())
        .collect();
    let stable = stable_marks(&kept);

    let mut anchor: Option<IdentityKey> = None;
    for (idx, item) in desired.iter().enumerate().rev() {
        match kept[idx] {
            Some(_) => {
                if target.content(&item.key) != Some(&item.content) {
                    target.patch(&item.key, item.content.clone());
                    report.patched += 1;
                }
                if !stable[idx] {
                    target.move_before(&item.key, anchor.as_ref());
                    report.moved += 1;
                }
            }
            None => {
                let placement = if options.animate && target.is_in_viewport(anchor.as_ref()) {
                    Placement::Animated
                } else {
                    Placement::Instant
                };
                target.insert(
                    item.key.clone(),
                    item.content.clone(),
                    anchor.as_ref(),
                    placement,
                );
                report.inserted += 1;
            }
        }
        anchor = Some(item.key.clone());
    }

    if !report.is_noop() {
        log::trace!("diff applied: {report:?}");
    }
    report
}

/// Mark the kept nodes forming a longest run already in increasing current
/// position; those stay put and every other kept node moves.
fn stable_marks(positions: &[Option<usize>]) -> Vec<bool> {
    // Patience sort over (position, desired index).
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; positions.len()];
    for (idx, pos) in positions.iter().enumerate() {
        let Some(pos) = *pos else { continue };
        let slot = tails.partition_point(|&t| positions[t].map_or(false, |p| p < pos));
        if slot > 0 {
            prev[idx] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(idx);
        } else {
            tails[slot] = idx;
        }
    }

    let mut marks = vec![false; positions.len()];
    let mut cursor = tails.last().copied();
    while let Some(idx) = cursor {
        marks[idx] = true;
        cursor = prev[idx];
    }
    marks
}
