//! Gap-filling merge of rank-ordered items into a bounded, descending window.
//!
//! Every function here keeps the list sorted strictly descending by rank with
//! no duplicate ranks, and never lets it grow past `window` entries.

use crate::types::{Entity, Entry, Rank};

/// What happened to an item handed to [`apply_ranked`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Merge {
    /// Newer than everything visible; prepended with placeholders for the gap.
    Prepended,
    /// Rank already visible (real or placeholder); replaced in place.
    Replaced,
    /// Rank between visible ranks with no slot; inserted in sorted position.
    Inserted,
    /// Older than the tail while the window still had room; appended with
    /// placeholders for the gap.
    Extended,
    /// Older than the full window; dropped.
    Discarded,
}

/// Merge one ranked entity into `items`.
pub fn apply_ranked(items: &mut Vec<Entry>, entity: Entity, window: usize) -> Merge {
    if window == 0 {
        items.clear();
        return Merge::Discarded;
    }
    let rank = entity.rank;
    let (max, min) = match (items.first(), items.last()) {
        (Some(first), Some(last)) => (first.rank(), last.rank()),
        _ => {
            items.push(Entry::Real(entity));
            return Merge::Prepended;
        }
    };

    if rank > max {
        // Only the top `window` ranks can survive truncation, so a huge jump
        // never materializes more than `window` placeholders.
        let span = (rank - max).min(window as u64) as usize;
        let mut head = Vec::with_capacity(span + items.len());
        head.push(Entry::Real(entity));
        head.extend((1..span as u64).map(|offset| Entry::Placeholder(rank - offset)));
        if span < window {
            head.append(items);
        }
        head.truncate(window);
        *items = head;
        return Merge::Prepended;
    }

    match items.binary_search_by(|e| rank.cmp(&e.rank())) {
        Ok(idx) => {
            items[idx] = Entry::Real(entity);
            Merge::Replaced
        }
        Err(idx) if idx < items.len() => {
            items.insert(idx, Entry::Real(entity));
            items.truncate(window);
            Merge::Inserted
        }
        Err(_) => {
            let run = (max - rank + 1) as u128;
            if items.len() >= window || run > window as u128 {
                return Merge::Discarded;
            }
            items.extend((rank + 1..min).rev().map(Entry::Placeholder));
            items.push(Entry::Real(entity));
            Merge::Extended
        }
    }
}

/// Sort, dedupe and bound a batch of entries, optionally synthesizing
/// placeholders between consecutive known ranks (initial page load).
///
/// When two entries share a rank the first real one wins.
pub fn normalize(mut entries: Vec<Entry>, window: usize, fill_gaps: bool) -> Vec<Entry> {
    // Stable sort keeps server order among equal ranks.
    entries.sort_by(|a, b| b.rank().cmp(&a.rank()));

    let mut out: Vec<Entry> = Vec::with_capacity(entries.len().min(window));
    for entry in entries {
        if out.len() >= window {
            break;
        }
        if let Some(last) = out.last_mut() {
            if last.rank() == entry.rank() {
                if last.is_placeholder() && !entry.is_placeholder() {
                    *last = entry;
                }
                continue;
            }
            if fill_gaps {
                let upper = last.rank();
                let mut missing = upper - 1;
                while missing > entry.rank() && out.len() < window {
                    out.push(Entry::Placeholder(missing));
                    missing -= 1;
                }
                if out.len() >= window {
                    break;
                }
            }
        }
        out.push(entry);
    }
    out
}

/// True when consecutive visible ranks differ by exactly one.
pub fn is_contiguous(items: &[Entry]) -> bool {
    items.windows(2).all(|pair| pair[0].rank() == pair[1].rank() + 1)
}

/// True when ranks are strictly descending.
pub fn is_strictly_descending(items: &[Entry]) -> bool {
    items.windows(2).all(|pair| pair[0].rank() > pair[1].rank())
}

pub fn ranks(items: &[Entry]) -> Vec<Rank> {
    items.iter().map(Entry::rank).collect()
}
