//! Shared types for slicing long entry listings into pages.

/// The config for paging the entries listing.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum entries to display per page when not specified in a request.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 100,
            max_pages: 5,
        }
    }
}

/// One element of the pagination control under the entries table.
#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

/// Builds the pagination control, collapsing long page runs into ellipses
/// around the current page.
///
/// At most `max_pages` numbered pages are shown. When pages are elided, the
/// first and last page stay reachable on either side of an ellipsis.
pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let half_window = max_pages / 2;

    let (first, last) = if page_count <= max_pages {
        (1, page_count)
    } else if curr_page <= half_window {
        (1, max_pages)
    } else if curr_page > page_count - half_window {
        (page_count - max_pages + 1, page_count)
    } else {
        (curr_page - half_window, curr_page + half_window)
    };

    let mut indicators = Vec::new();

    if curr_page > 1 {
        indicators.push(PaginationIndicator::BackButton(curr_page - 1));
    }

    if first > 1 {
        indicators.push(PaginationIndicator::Page(1));
        indicators.push(PaginationIndicator::Ellipsis);
    }

    for page in first..=last {
        if page == curr_page {
            indicators.push(PaginationIndicator::CurrPage(page));
        } else {
            indicators.push(PaginationIndicator::Page(page));
        }
    }

    if last < page_count {
        indicators.push(PaginationIndicator::Ellipsis);
        indicators.push(PaginationIndicator::Page(page_count));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}
