//! Differ tests - identity-keyed updates against the in-memory render tree

use scoutfeed::differ::{diff, DiffOptions, RenderItem, RenderTarget};
use scoutfeed::render::{MemoryTarget, Transition, Viewport};
use scoutfeed::types::IdentityKey;

fn items(keys: &[&str]) -> Vec<RenderItem> {
    keys.iter().map(|k| RenderItem::new(*k, format!("<{k}>"))).collect()
}

fn rendered(target: &MemoryTarget) -> Vec<String> {
    target.lines().into_iter().map(str::to_string).collect()
}

fn seeded(keys: &[&str]) -> MemoryTarget {
    let mut target = MemoryTarget::new();
    diff(&mut target, &items(keys), DiffOptions::default());
    target
}

#[test]
fn second_pass_with_same_list_is_a_noop() {
    let mut target = MemoryTarget::new();
    let desired = items(&["a", "b", "c"]);
    let first = diff(&mut target, &desired, DiffOptions::default());
    assert_eq!(first.inserted, 3);

    let second = diff(&mut target, &desired, DiffOptions::default());
    assert!(second.is_noop(), "{second:?}");
}

#[test]
fn moving_one_item_moves_only_that_item() {
    let mut target = seeded(&["a", "b", "c", "d"]);
    let report = diff(&mut target, &items(&["d", "a", "b", "c"]), DiffOptions::default());
    assert_eq!(report.moved, 1);
    assert_eq!(report.inserted + report.removed + report.patched, 0);
    assert_eq!(rendered(&target), ["<d>", "<a>", "<b>", "<c>"]);
}

#[test]
fn reversing_keeps_one_node_in_place() {
    let mut target = seeded(&["a", "b", "c", "d"]);
    let report = diff(&mut target, &items(&["d", "c", "b", "a"]), DiffOptions::default());
    assert_eq!(report.moved, 3);
    assert_eq!(rendered(&target), ["<d>", "<c>", "<b>", "<a>"]);
}

#[test]
fn mixed_update_reuses_nodes_by_identity() {
    let mut target = seeded(&["a", "b", "c", "d", "e"]);
    let mut desired = items(&["x", "c", "a", "e"]);
    desired[3] = RenderItem::new("e", "<e v2>");

    let report = diff(&mut target, &desired, DiffOptions::default());
    assert_eq!(report.inserted, 1);
    assert_eq!(report.removed, 2);
    assert_eq!(report.patched, 1);
    assert_eq!(report.moved, 1);
    assert_eq!(rendered(&target), ["<x>", "<c>", "<a>", "<e v2>"]);
}

#[test]
fn duplicate_desired_keys_render_once() {
    let mut target = MemoryTarget::new();
    diff(&mut target, &items(&["a", "b", "a"]), DiffOptions::default());
    assert_eq!(
        target.live_keys(),
        vec![IdentityKey::from("a"), IdentityKey::from("b")]
    );
}

#[test]
fn animated_removal_leaves_until_transitions_complete() {
    let mut target = seeded(&["a", "b", "c"]);
    let options = DiffOptions { animate: true };
    let report = diff(&mut target, &items(&["a", "c"]), options);
    assert_eq!(report.removed, 1);

    // Still in the tree, but no longer live.
    assert_eq!(target.nodes().len(), 3);
    assert!(target.is_leaving(&IdentityKey::from("b")));
    assert_eq!(rendered(&target), ["<a>", "<c>"]);

    assert_eq!(target.complete_transitions(), 1);
    assert_eq!(target.nodes().len(), 2);
}

#[test]
fn insert_outside_the_viewport_is_instant() {
    let mut target = seeded(&["a", "b", "c", "d"]);
    target.set_viewport(Viewport { top: 2, height: 2 });

    diff(
        &mut target,
        &items(&["new", "a", "b", "c", "d"]),
        DiffOptions { animate: true },
    );

    let inserted = target
        .nodes()
        .iter()
        .find(|n| n.key.as_str() == "new")
        .map(|n| n.transition);
    assert_eq!(inserted, Some(Transition::Present));
    // The rows the reader was looking at did not shift.
    assert_eq!(target.viewport().top, 3);
}
