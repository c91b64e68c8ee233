//! Per-keyword crawl states and the pagination decision

use std::fmt;

/// Why a keyword lineage stopped paginating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// The page limit per keyword was reached
    MaxPages,
    /// The page had no candidate links
    NoResults,
    /// The page had no next-page indicator
    LastPage,
}

/// Where a keyword lineage currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordState {
    Queued,
    FetchingResults { page: u32 },
    ExtractingLinks { page: u32 },
    DispatchingDetails { page: u32, links: usize },
    Paginating { next_page: u32 },
    Complete(CompletionReason),
    /// The results fetch failed; the keyword stays queued until its attempt cap
    Failed { page: u32 },
    /// The run was cancelled mid-lineage
    Interrupted,
}

impl fmt::Display for KeywordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordState::Queued => write!(f, "QUEUED"),
            KeywordState::FetchingResults { page } => write!(f, "FETCHING_RESULTS(page {})", page),
            KeywordState::ExtractingLinks { page } => write!(f, "EXTRACTING_LINKS(page {})", page),
            KeywordState::DispatchingDetails { page, links } => {
                write!(f, "DISPATCHING_DETAILS(page {}, {} links)", page, links)
            }
            KeywordState::Paginating { next_page } => write!(f, "PAGINATING(page {})", next_page),
            KeywordState::Complete(reason) => write!(f, "COMPLETE({:?})", reason),
            KeywordState::Failed { page } => write!(f, "FAILED(page {})", page),
            KeywordState::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// What to do after a results page has been dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Paginate,
    Complete(CompletionReason),
}

/// Decide whether a lineage continues after `page`
pub fn decide_after_page(page: u32, max_pages: u32, link_count: usize, has_next_page: bool) -> PageDecision {
    if page >= max_pages {
        PageDecision::Complete(CompletionReason::MaxPages)
    } else if link_count == 0 {
        PageDecision::Complete(CompletionReason::NoResults)
    } else if !has_next_page {
        PageDecision::Complete(CompletionReason::LastPage)
    } else {
        PageDecision::Paginate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_after_page() {
        assert_eq!(decide_after_page(1, 1, 20, true), PageDecision::Complete(CompletionReason::MaxPages));
        assert_eq!(decide_after_page(1, 3, 0, true), PageDecision::Complete(CompletionReason::NoResults));
        assert_eq!(decide_after_page(2, 3, 12, false), PageDecision::Complete(CompletionReason::LastPage));
        assert_eq!(decide_after_page(2, 3, 12, true), PageDecision::Paginate);
        assert_eq!(decide_after_page(3, 3, 0, false), PageDecision::Complete(CompletionReason::MaxPages));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(KeywordState::Interrupted.to_string(), "INTERRUPTED");
        assert_eq!(KeywordState::FetchingResults { page: 2 }.to_string(), "FETCHING_RESULTS(page 2)");
    }
}
