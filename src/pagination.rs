//! Page-number links and prev/next control state for paginated listings.

use crate::state::{ListState, Pagination};

/// Pages shown inline before the list collapses into a window.
pub const MAX_INLINE_PAGES: u32 = 7;
/// Width of the sliding window around the current page.
pub const GROUPED_PAGES: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageLink {
    Page {
        number: u32,
        active: bool,
        disabled: bool,
    },
    Ellipsis,
}

impl PageLink {
    pub fn label(&self) -> String {
        match self {
            PageLink::Page { number, active, .. } if *active => format!("[{number}]"),
            PageLink::Page { number, .. } => number.to_string(),
            PageLink::Ellipsis => "...".to_string(),
        }
    }
}

struct Links {
    out: Vec<PageLink>,
    current: u32,
    loading: bool,
}

impl Links {
    fn page(&mut self, number: u32) {
        self.out.push(PageLink::Page {
            number,
            active: number == self.current,
            disabled: self.loading,
        });
    }

    fn range(&mut self, start: u32, end: u32) {
        for n in start..=end {
            self.page(n);
        }
    }

    fn ellipsis(&mut self) {
        self.out.push(PageLink::Ellipsis);
    }
}

/// Windowed page links for `pages_limit` pages with `current` selected.
pub fn page_links(pages_limit: u32, current: u32, loading: bool) -> Vec<PageLink> {
    let mut links = Links {
        out: Vec::new(),
        current,
        loading,
    };
    let limit = pages_limit;
    let step = GROUPED_PAGES / 2;

    if limit < 1 {
        return links.out;
    }
    if limit <= MAX_INLINE_PAGES {
        links.range(1, limit);
    } else if current < GROUPED_PAGES {
        links.range(1, GROUPED_PAGES);
        links.ellipsis();
        links.page(limit);
    } else if current > limit - GROUPED_PAGES {
        links.page(1);
        links.ellipsis();
        links.range(limit - GROUPED_PAGES, limit);
    } else {
        links.page(1);
        if current - step - 1 == 2 {
            links.page(2);
        } else if current - step > 2 {
            links.ellipsis();
        }
        links.range(current - step, current + step);
        if current + step + 1 == limit - 1 {
            links.page(limit - 1);
        } else if current + step < limit - 1 {
            links.ellipsis();
        }
        links.page(limit);
    }
    links.out
}

/// Validate a typed page number. Accepted only when it parses, lies within
/// `1..=pages_limit` and nothing is loading.
pub fn parse_jump(input: &str, state: &ListState) -> Option<u32> {
    let number = input.trim().parse::<u32>().ok()?;
    jump_target(number, state)
}

/// `number` when a jump to it is currently allowed.
pub fn jump_target(number: u32, state: &ListState) -> Option<u32> {
    let limit = state.pages_limit()?;
    if state.request.is_loading() || !(1..=limit).contains(&number) {
        return None;
    }
    Some(number)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Control {
    Hidden,
    Disabled,
    Enabled,
}

fn control(state: &ListState, at_bound: bool) -> Control {
    if state.empty_response {
        Control::Hidden
    } else if state.request.is_loading() || state.request.error.is_some() || at_bound {
        Control::Disabled
    } else {
        Control::Enabled
    }
}

pub fn prev_control(state: &ListState) -> Control {
    let at_bound = match &state.pagination {
        Pagination::Cursor { prev_page_path, .. } => prev_page_path.is_none(),
        Pagination::Indexed { page_number, .. } => *page_number <= 1,
    };
    control(state, at_bound)
}

pub fn next_control(state: &ListState) -> Control {
    control(state, !state.pagination.has_next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FeedSettings, PaginationMode, RequestPhase};

    fn labels(links: &[PageLink]) -> Vec<String> {
        links.iter().map(PageLink::label).collect()
    }

    #[test]
    fn short_listings_show_every_page() {
        assert!(page_links(0, 1, false).is_empty());
        assert_eq!(labels(&page_links(3, 2, false)), vec!["1", "[2]", "3"]);
        assert_eq!(page_links(7, 1, false).len(), 7);
    }

    #[test]
    fn near_the_start() {
        assert_eq!(
            labels(&page_links(20, 2, false)),
            vec!["1", "[2]", "3", "...", "20"]
        );
    }

    #[test]
    fn near_the_end() {
        assert_eq!(
            labels(&page_links(20, 18, false)),
            vec!["1", "...", "17", "[18]", "19", "20"]
        );
    }

    #[test]
    fn middle_window_with_both_ellipses() {
        assert_eq!(
            labels(&page_links(20, 10, false)),
            vec!["1", "...", "9", "[10]", "11", "...", "20"]
        );
    }

    #[test]
    fn middle_window_pins_neighbours_of_the_bounds() {
        assert_eq!(
            labels(&page_links(10, 4, false)),
            vec!["1", "2", "3", "[4]", "5", "...", "10"]
        );
        assert_eq!(
            labels(&page_links(10, 7, false)),
            vec!["1", "...", "6", "[7]", "8", "9", "10"]
        );
        assert_eq!(
            labels(&page_links(10, 3, false)),
            vec!["1", "2", "[3]", "4", "...", "10"]
        );
    }

    #[test]
    fn loading_disables_every_link() {
        assert!(page_links(5, 1, true).iter().all(|l| matches!(
            l,
            PageLink::Page { disabled: true, .. }
        )));
    }

    #[test]
    fn jump_requires_valid_number_in_range_and_idle() {
        let mut state = ListState::new(FeedSettings::default(), PaginationMode::Indexed);
        if let Pagination::Indexed { pages_limit, .. } = &mut state.pagination {
            *pages_limit = 5;
        }
        assert_eq!(parse_jump("3", &state), Some(3));
        assert_eq!(parse_jump("6", &state), None);
        assert_eq!(parse_jump("0", &state), None);
        assert_eq!(parse_jump("x", &state), None);
        state.request.phase = RequestPhase::Loading;
        assert_eq!(parse_jump("3", &state), None);
    }

    #[test]
    fn controls_follow_bounds_and_request_state() {
        let mut state = ListState::new(FeedSettings::default(), PaginationMode::Indexed);
        state.pagination = Pagination::Indexed {
            page_number: 1,
            pages_limit: 3,
            params: Default::default(),
        };
        assert_eq!(prev_control(&state), Control::Disabled);
        assert_eq!(next_control(&state), Control::Enabled);

        state.request.error = Some("boom".into());
        assert_eq!(next_control(&state), Control::Disabled);

        state.empty_response = true;
        assert_eq!(next_control(&state), Control::Hidden);
    }
}
