//! The list reducer: the only code allowed to produce a new [`ListState`].

use crate::action::{Action, FetchedPage, PageLoad, PageTarget};
use crate::reconcile::{apply_ranked, normalize};
use crate::state::{Counter, FeedOrder, ListState, Pagination};
use crate::types::{Candidate, Entity, Entry};
use std::collections::HashSet;

pub fn reduce(state: &ListState, action: &Action) -> ListState {
    let mut next = state.clone();
    match action {
        Action::PageLoad(load) => page_load(&mut next, load),
        Action::StartRequest { generation, target } => {
            next.hold_position();
            next.request.phase = crate::state::RequestPhase::Loading;
            next.request.generation = *generation;
            next.request.error = None;
            match target {
                PageTarget::Path(path) => next.current_page_path = Some(path.clone()),
                PageTarget::Number(n) => {
                    if let Pagination::Indexed { page_number, .. } = &mut next.pagination {
                        *page_number = *n;
                    }
                }
            }
        }
        Action::ItemsFetched { generation, page } => {
            if *generation != next.request.generation {
                log::debug!(
                    "discarding stale page (generation {generation}, active {})",
                    next.request.generation
                );
                return next;
            }
            next.pending_position = None;
            items_fetched(&mut next, page);
        }
        Action::RequestError {
            generation,
            message,
        } => {
            if *generation != next.request.generation {
                log::debug!("discarding stale request error (generation {generation})");
                return next;
            }
            next.restore_position();
            next.request.phase = crate::state::RequestPhase::Errored;
            next.request.error = Some(message.clone());
        }
        Action::FinishRequest { generation } => {
            if *generation == next.request.generation {
                next.request.phase = crate::state::RequestPhase::Idle;
            }
        }
        Action::ReceivedItem(item) => receive_live(&mut next, std::slice::from_ref(item), false),
        Action::ReceivedBatch(items) => receive_live(&mut next, items, true),
        Action::ChannelDisconnected => {
            next.channel_disconnected = true;
            next.overflow.clear();
        }
        Action::NavigateToOlder => {
            next.hold_position();
            navigate_older(&mut next);
        }
        Action::NavigateToNewer => {
            next.hold_position();
            if let Pagination::Cursor { pages_stack, .. } = &mut next.pagination {
                pages_stack.pop();
                next.beyond_page_one = pages_stack.len() > 1;
            }
        }
        Action::OverflowExpanded => next.overflow.clear(),
    }
    next
}

fn page_load(state: &mut ListState, load: &PageLoad) {
    state.pending_position = None;
    if let Some(path) = &load.listing_path {
        state.listing_path = Some(path.clone());
        state.current_page_path = Some(path.clone());
    }
    if let Some(address) = &load.address_hash {
        state.filter.address_hash = Some(address.clone());
    }
    if let Some(mode) = load.filter {
        state.filter.mode = mode;
    }
    if let Some(beyond) = load.beyond_page_one {
        state.beyond_page_one = beyond;
    }
    if let Some(path) = &load.next_page_path {
        if let Pagination::Cursor { next_page_path, .. } = &mut state.pagination {
            *next_page_path = Some(path.clone());
        }
    }
    if load.item_count.is_some() {
        state.item_count = load.item_count;
    }
    if load.validation_count.is_some() {
        state.validation_count = load.validation_count;
    }
    if let Some(items) = &load.items {
        place_page(state, items.clone());
    }
    // Anything still in flight belongs to the previous context.
    state.request.generation += 1;
    state.request.phase = crate::state::RequestPhase::Idle;
}

fn items_fetched(state: &mut ListState, page: &FetchedPage) {
    state.request.phase = crate::state::RequestPhase::Loaded;
    state.request.error = None;
    state.empty_response = page.items.is_empty();

    match &mut state.pagination {
        Pagination::Cursor {
            next_page_path,
            prev_page_path,
            pages_stack,
        } => {
            *next_page_path = page.next_page_path.clone();
            *prev_page_path = pages_stack
                .len()
                .checked_sub(2)
                .and_then(|idx| pages_stack.get(idx).cloned());
        }
        Pagination::Indexed {
            page_number,
            pages_limit,
            params,
        } => match &page.next_page_params {
            Some(p) => {
                *page_number = p.page_number;
                *pages_limit = p.pages_limit;
                *params = p.rest.clone();
                state.beyond_page_one = p.page_number != 1;
            }
            None => {
                *page_number = 1;
                *pages_limit = 1;
                params.clear();
                state.beyond_page_one = false;
            }
        },
    }

    place_page(state, page.items.clone());
}

/// Replace the visible list with a page of items.
fn place_page(state: &mut ListState, items: Vec<Candidate>) {
    let admitted = state.filter.admit_all(items);
    let window = state.settings.window;
    state.items = match state.settings.order {
        FeedOrder::Ranked => {
            let entries = admitted
                .into_iter()
                .filter_map(|c| match c.rank {
                    Some(rank) => Some(Entry::Real(c.into_entity(rank))),
                    None => {
                        log::warn!("dropping unranked item {} from ranked page", c.key);
                        None
                    }
                })
                .collect();
            // Older pages are a frozen historical view.
            normalize(entries, window, !state.beyond_page_one)
        }
        FeedOrder::Stream => {
            let mut seen = HashSet::new();
            let unique: Vec<Candidate> = admitted
                .into_iter()
                .filter(|c| seen.insert(c.key.clone()))
                .take(window)
                .collect();
            let base = state.next_seq;
            let n = unique.len() as u64;
            state.next_seq += n;
            unique
                .into_iter()
                .enumerate()
                .map(|(i, c)| Entry::Real(c.into_entity(base + n - i as u64)))
                .collect()
        }
    };
}

fn receive_live(state: &mut ListState, items: &[Candidate], batched: bool) {
    if state.channel_disconnected || items.is_empty() {
        return;
    }

    let arrived = items.len() as u64;
    match state.settings.counter {
        Counter::Items => state.item_count = Some(state.item_count.unwrap_or(0) + arrived),
        Counter::Validations => {
            state.validation_count = Some(state.validation_count.unwrap_or(0) + arrived)
        }
    }

    if state.beyond_page_one {
        return;
    }

    let admitted: Vec<&Candidate> = items.iter().filter(|c| state.filter.admits(c)).collect();
    if admitted.is_empty() {
        return;
    }

    match state.settings.order {
        FeedOrder::Ranked => {
            for candidate in admitted {
                match candidate.rank {
                    Some(rank) => {
                        let merge = apply_ranked(
                            &mut state.items,
                            candidate.clone().into_entity(rank),
                            state.settings.window,
                        );
                        log::trace!("rank {rank}: {merge:?}");
                    }
                    None => log::warn!("dropping unranked live item {}", candidate.key),
                }
            }
        }
        FeedOrder::Stream => {
            let over_threshold = batched
                && state
                    .settings
                    .batch_threshold
                    .is_some_and(|threshold| admitted.len() >= threshold);

            if !state.overflow.is_empty() || over_threshold {
                state
                    .overflow
                    .extend(admitted.into_iter().map(|c| c.key.clone()));
                log::debug!("{} live items held in overflow", state.overflow.len());
                return;
            }

            // Newest first, later duplicates win.
            let mut seen = HashSet::new();
            let mut fresh: Vec<Entity> = Vec::with_capacity(admitted.len());
            for candidate in admitted.into_iter().rev() {
                if seen.insert(candidate.key.clone()) {
                    fresh.push(candidate.clone().into_entity(0));
                }
            }
            let top = state.next_seq + fresh.len() as u64;
            for (i, entity) in fresh.iter_mut().enumerate() {
                entity.rank = top - i as u64;
            }
            state.next_seq = top;

            let window = state.settings.window;
            let mut merged: Vec<Entry> = fresh.into_iter().map(Entry::Real).collect();
            merged.extend(
                state
                    .items
                    .drain(..)
                    .filter(|e| !seen.contains(&e.identity())),
            );
            merged.truncate(window);
            state.items = merged;
        }
    }
}

fn navigate_older(state: &mut ListState) {
    match &mut state.pagination {
        Pagination::Cursor {
            next_page_path,
            pages_stack,
            ..
        } => {
            let Some(next) = next_page_path.clone() else {
                return;
            };
            if pages_stack.is_empty() {
                if let Some(current) = &state.current_page_path {
                    pages_stack.push(current.clone());
                }
            }
            pages_stack.push(next);
            state.beyond_page_one = true;
        }
        Pagination::Indexed { .. } => state.beyond_page_one = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PageParams;
    use crate::filter::FilterMode;
    use crate::reconcile::ranks;
    use crate::state::{FeedSettings, PaginationMode, RequestPhase};
    use crate::types::IdentityKey;

    fn blocks_state(window: usize) -> ListState {
        ListState::new(
            FeedSettings {
                order: FeedOrder::Ranked,
                window,
                batch_threshold: None,
                counter: Counter::Items,
            },
            PaginationMode::Cursor,
        )
    }

    fn txs_state(threshold: usize) -> ListState {
        ListState::new(
            FeedSettings {
                order: FeedOrder::Stream,
                window: 50,
                batch_threshold: Some(threshold),
                counter: Counter::Items,
            },
            PaginationMode::Cursor,
        )
    }

    fn block(rank: u64) -> Candidate {
        Candidate::ranked(rank, format!("<div data-block-number=\"{rank}\"></div>"))
    }

    fn tx(hash: &str) -> Candidate {
        Candidate::new(hash, format!("<div data-identifier-hash=\"{hash}\"></div>"))
    }

    fn txs(n: usize) -> Vec<Candidate> {
        (0..n).map(|i| tx(&format!("0x{i:02}"))).collect()
    }

    fn keys(state: &ListState) -> Vec<String> {
        state.items.iter().map(|e| e.identity().to_string()).collect()
    }

    #[test]
    fn receives_first_block() {
        let state = reduce(&blocks_state(10), &Action::ReceivedItem(block(1)));
        assert_eq!(ranks(&state.items), vec![1]);
    }

    #[test]
    fn ignores_blocks_beyond_page_one() {
        let mut state = blocks_state(10);
        state.beyond_page_one = true;
        let out = reduce(&state, &Action::ReceivedItem(block(1)));
        assert!(out.items.is_empty());
    }

    #[test]
    fn out_of_order_blocks_get_placeholders() {
        let state = reduce(&blocks_state(10), &Action::ReceivedItem(block(2)));
        let state = reduce(&state, &Action::ReceivedItem(block(5)));
        assert_eq!(ranks(&state.items), vec![5, 4, 3, 2]);
        assert!(state.items[1].is_placeholder());
        assert!(state.items[2].is_placeholder());
    }

    #[test]
    fn disconnect_freezes_live_items() {
        let state = reduce(&blocks_state(10), &Action::ReceivedItem(block(7)));
        let state = reduce(&state, &Action::ChannelDisconnected);
        assert!(state.channel_disconnected);
        let after = reduce(&state, &Action::ReceivedItem(block(8)));
        assert_eq!(after.items, state.items);
        let after = reduce(&after, &Action::ReceivedBatch(vec![block(9), block(10)]));
        assert_eq!(after.items, state.items);
    }

    #[test]
    fn small_batch_merges_newest_first() {
        let state = reduce(&txs_state(10), &Action::ReceivedBatch(txs(5)));
        assert_eq!(state.overflow_count(), 0);
        assert_eq!(keys(&state), vec!["0x04", "0x03", "0x02", "0x01", "0x00"]);
        assert_eq!(state.item_count, Some(5));
    }

    #[test]
    fn large_batch_goes_to_overflow() {
        let state = reduce(&txs_state(10), &Action::ReceivedBatch(txs(11)));
        assert!(state.items.is_empty());
        assert_eq!(state.overflow_count(), 11);
        assert_eq!(state.item_count, Some(11));
    }

    #[test]
    fn pending_overflow_captures_every_later_batch() {
        let state = reduce(&txs_state(6), &Action::ReceivedBatch(txs(6)));
        let state = reduce(&state, &Action::ReceivedBatch(vec![tx("0xaa")]));
        let state = reduce(&state, &Action::ReceivedItem(tx("0xbb")));
        assert!(state.items.is_empty());
        assert_eq!(state.overflow_count(), 8);
        assert!(state.overflow.contains(&IdentityKey::from("0xbb")));

        let state = reduce(&state, &Action::OverflowExpanded);
        assert_eq!(state.overflow_count(), 0);
        let state = reduce(&state, &Action::ReceivedBatch(vec![tx("0xcc")]));
        assert_eq!(keys(&state), vec!["0xcc"]);
    }

    #[test]
    fn overflow_counts_each_key_once() {
        let state = reduce(&txs_state(3), &Action::ReceivedBatch(txs(4)));
        assert_eq!(state.overflow_count(), 4);
        let again = vec![tx("0x01"), tx("0x02"), tx("0x01"), tx("0xff")];
        let state = reduce(&state, &Action::ReceivedBatch(again));
        assert_eq!(state.overflow_count(), 5);
        let state = reduce(&state, &Action::ReceivedItem(tx("0x03")));
        assert_eq!(state.overflow_count(), 5);
        assert_eq!(state.item_count, Some(9));
        assert!(state.items.is_empty());
    }

    #[test]
    fn live_duplicates_replace_visible_item() {
        let state = reduce(&txs_state(10), &Action::ReceivedBatch(vec![tx("0x1"), tx("0x2")]));
        let state = reduce(&state, &Action::ReceivedBatch(vec![tx("0x1")]));
        assert_eq!(keys(&state), vec!["0x1", "0x2"]);
        assert!(crate::reconcile::is_strictly_descending(&state.items));
    }

    #[test]
    fn filter_applies_before_threshold() {
        let mut state = txs_state(3);
        state.filter.address_hash = Some("0xme".into());
        state.filter.mode = FilterMode::From;
        let batch = vec![
            tx("a").with_roles(Some("0xme"), Some("0x1")),
            tx("b").with_roles(Some("0x1"), Some("0xme")),
            tx("c").with_roles(Some("0x2"), Some("0xme")),
            tx("d").with_roles(Some("0xME"), Some("0x3")),
        ];
        let out = reduce(&state, &Action::ReceivedBatch(batch));
        assert_eq!(keys(&out), vec!["d", "a"]);
        assert_eq!(out.overflow_count(), 0);
    }

    #[test]
    fn beyond_page_one_only_counts() {
        let mut state = txs_state(10);
        state.beyond_page_one = true;
        state.item_count = Some(100);
        let out = reduce(&state, &Action::ReceivedBatch(txs(2)));
        assert!(out.items.is_empty());
        assert_eq!(out.item_count, Some(102));
    }

    #[test]
    fn validations_feed_advances_validation_count() {
        let mut state = txs_state(10);
        state.settings.counter = Counter::Validations;
        let out = reduce(&state, &Action::ReceivedItem(tx("0xb")));
        assert_eq!(out.validation_count, Some(1));
        assert_eq!(out.item_count, None);
    }

    #[test]
    fn request_lifecycle() {
        let state = txs_state(10);
        let loading = reduce(
            &state,
            &Action::StartRequest {
                generation: 1,
                target: PageTarget::Path("/txs".into()),
            },
        );
        assert_eq!(loading.request.phase, RequestPhase::Loading);
        assert_eq!(loading.current_page_path.as_deref(), Some("/txs"));

        let errored = reduce(
            &loading,
            &Action::RequestError {
                generation: 1,
                message: "http 502".into(),
            },
        );
        assert_eq!(errored.request.phase, RequestPhase::Errored);
        let idle = reduce(&errored, &Action::FinishRequest { generation: 1 });
        assert_eq!(idle.request.phase, RequestPhase::Idle);
        assert_eq!(idle.request.error.as_deref(), Some("http 502"));
    }

    #[test]
    fn request_error_keeps_items() {
        let state = reduce(&txs_state(10), &Action::ReceivedBatch(txs(2)));
        let out = reduce(
            &state,
            &Action::RequestError {
                generation: 0,
                message: "boom".into(),
            },
        );
        assert_eq!(out.items, state.items);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let state = reduce(
            &txs_state(10),
            &Action::StartRequest {
                generation: 2,
                target: PageTarget::Path("/txs".into()),
            },
        );
        let page = FetchedPage {
            items: txs(3),
            ..FetchedPage::default()
        };
        let stale = reduce(
            &state,
            &Action::ItemsFetched {
                generation: 1,
                page: page.clone(),
            },
        );
        assert!(stale.items.is_empty());
        assert_eq!(stale.request.phase, RequestPhase::Loading);

        let fresh = reduce(&state, &Action::ItemsFetched { generation: 2, page });
        assert_eq!(fresh.items.len(), 3);
    }

    #[test]
    fn page_load_invalidates_in_flight_requests() {
        let started = reduce(
            &txs_state(10),
            &Action::StartRequest {
                generation: 1,
                target: PageTarget::Path("/a".into()),
            },
        );
        let moved = reduce(
            &started,
            &Action::PageLoad(PageLoad {
                address_hash: Some("0xother".into()),
                ..PageLoad::default()
            }),
        );
        let late = reduce(
            &moved,
            &Action::ItemsFetched {
                generation: 1,
                page: FetchedPage {
                    items: txs(1),
                    ..FetchedPage::default()
                },
            },
        );
        assert!(late.items.is_empty());
    }

    #[test]
    fn first_ranked_page_is_gap_filled_later_pages_are_not() {
        let page = FetchedPage {
            items: vec![block(9), block(6)],
            next_page_path: Some("/blocks?block_number=5".into()),
            next_page_params: None,
        };
        let live = reduce(
            &blocks_state(10),
            &Action::ItemsFetched {
                generation: 0,
                page: page.clone(),
            },
        );
        assert_eq!(ranks(&live.items), vec![9, 8, 7, 6]);

        let mut frozen = blocks_state(10);
        frozen.beyond_page_one = true;
        let frozen = reduce(&frozen, &Action::ItemsFetched { generation: 0, page });
        assert_eq!(ranks(&frozen.items), vec![9, 6]);
    }

    #[test]
    fn cursor_navigation_tracks_pages_stack() {
        let state = reduce(
            &txs_state(10),
            &Action::PageLoad(PageLoad {
                listing_path: Some("/txs".into()),
                ..PageLoad::default()
            }),
        );
        let state = reduce(
            &state,
            &Action::ItemsFetched {
                generation: state.request.generation,
                page: FetchedPage {
                    items: txs(1),
                    next_page_path: Some("/txs?index=2".into()),
                    next_page_params: None,
                },
            },
        );
        assert!(state.pagination.has_next());
        assert!(!state.pagination.has_prev());

        let older = reduce(&state, &Action::NavigateToOlder);
        assert!(older.beyond_page_one);
        let older = reduce(
            &older,
            &Action::ItemsFetched {
                generation: older.request.generation,
                page: FetchedPage {
                    items: txs(1),
                    next_page_path: None,
                    next_page_params: None,
                },
            },
        );
        match &older.pagination {
            Pagination::Cursor {
                prev_page_path,
                pages_stack,
                next_page_path,
            } => {
                assert_eq!(prev_page_path.as_deref(), Some("/txs"));
                assert_eq!(pages_stack.len(), 2);
                assert!(next_page_path.is_none());
            }
            other => panic!("unexpected pagination {other:?}"),
        }

        let newer = reduce(&older, &Action::NavigateToNewer);
        assert!(!newer.beyond_page_one);
    }

    #[test]
    fn failed_navigation_restores_the_position() {
        let state = reduce(
            &txs_state(10),
            &Action::PageLoad(PageLoad {
                listing_path: Some("/txs".into()),
                next_page_path: Some("/txs?index=2".into()),
                ..PageLoad::default()
            }),
        );
        let before = state.pagination.clone();
        let moved = reduce(&state, &Action::NavigateToOlder);
        let generation = moved.request.generation + 1;
        let moved = reduce(
            &moved,
            &Action::StartRequest {
                generation,
                target: PageTarget::Path("/txs?index=2".into()),
            },
        );
        assert!(moved.beyond_page_one);

        let failed = reduce(
            &moved,
            &Action::RequestError {
                generation,
                message: "http 500".into(),
            },
        );
        assert_eq!(failed.pagination, before);
        assert!(!failed.beyond_page_one);
        assert_eq!(failed.current_page_path.as_deref(), Some("/txs"));
        assert!(failed.accepts_live_items());
        assert!(failed.pending_position.is_none());
    }

    #[test]
    fn stale_error_keeps_the_new_position() {
        let mut state = txs_state(10);
        state.pagination = Pagination::Cursor {
            next_page_path: Some("/txs?index=2".into()),
            prev_page_path: None,
            pages_stack: Vec::new(),
        };
        let moved = reduce(&state, &Action::NavigateToOlder);
        let moved = reduce(
            &moved,
            &Action::StartRequest {
                generation: 3,
                target: PageTarget::Path("/txs?index=2".into()),
            },
        );
        let out = reduce(
            &moved,
            &Action::RequestError {
                generation: 2,
                message: "late".into(),
            },
        );
        assert!(out.beyond_page_one);
        assert!(out.pending_position.is_some());
    }

    #[test]
    fn failed_indexed_jump_keeps_the_page_number() {
        let state = ListState::new(FeedSettings::default(), PaginationMode::Indexed);
        let page = FetchedPage {
            items: txs(2),
            next_page_path: None,
            next_page_params: Some(PageParams {
                page_number: 2,
                pages_limit: 9,
                rest: Default::default(),
            }),
        };
        let shown = reduce(&state, &Action::ItemsFetched { generation: 0, page });
        let jumping = reduce(
            &shown,
            &Action::StartRequest {
                generation: 1,
                target: PageTarget::Number(7),
            },
        );
        assert_eq!(jumping.page_number(), Some(7));
        let failed = reduce(
            &jumping,
            &Action::RequestError {
                generation: 1,
                message: "http 502".into(),
            },
        );
        assert_eq!(failed.page_number(), Some(2));
    }

    #[test]
    fn indexed_page_sets_beyond_page_one() {
        let state = ListState::new(FeedSettings::default(), PaginationMode::Indexed);
        let page = |n: u32| FetchedPage {
            items: txs(2),
            next_page_path: None,
            next_page_params: Some(PageParams {
                page_number: n,
                pages_limit: 9,
                rest: [("block_number".to_string(), "77".to_string())].into(),
            }),
        };
        let third = reduce(&state, &Action::ItemsFetched { generation: 0, page: page(3) });
        assert!(third.beyond_page_one);
        assert_eq!(third.page_number(), Some(3));
        assert_eq!(third.pages_limit(), Some(9));

        let first = reduce(&third, &Action::ItemsFetched { generation: 0, page: page(1) });
        assert!(!first.beyond_page_one);

        let unpaged = reduce(
            &third,
            &Action::ItemsFetched {
                generation: 0,
                page: FetchedPage::default(),
            },
        );
        assert_eq!(unpaged.page_number(), Some(1));
        assert_eq!(unpaged.pages_limit(), Some(1));
        assert!(unpaged.empty_response);
    }

    #[test]
    fn navigate_to_older_sets_beyond_page_one_in_indexed_mode() {
        let state = ListState::new(FeedSettings::default(), PaginationMode::Indexed);
        assert!(reduce(&state, &Action::NavigateToOlder).beyond_page_one);
    }
}
