//! Page-window calculation for pagination controls.
//!
//! Produces a bounded, ellipsis-compressed list of page markers from the
//! current page and the total page count. Pure and deterministic; the
//! frontends render the markers as buttons and separators.

use serde::{Serialize, Serializer};

/// One slot in the rendered pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageItem::Page(page) => serializer.serialize_u32(*page),
            PageItem::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// Compute the page window for `(current_page, total_pages)`.
///
/// Up to five pages are listed in full. Beyond that: always page 1, an
/// ellipsis when the window is detached from it, the pages adjacent to the
/// current one, an ellipsis when detached from the end, and the final page.
pub fn page_window(current_page: u32, total_pages: u32) -> Vec<PageItem> {
    const MAX_VISIBLE: u32 = 5;

    if total_pages <= MAX_VISIBLE {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let mut pages = vec![PageItem::Page(1)];

    if current_page > 3 {
        pages.push(PageItem::Ellipsis);
    }

    // Near the first page the window extends to 3 so the control never
    // collapses to a lone neighbour.
    let start = current_page.saturating_sub(1).max(2);
    let end = (current_page + 1).max(3).min(total_pages - 1);
    for page in start..=end {
        pages.push(PageItem::Page(page));
    }

    if current_page < total_pages - 2 {
        pages.push(PageItem::Ellipsis);
    }

    if total_pages > 1 {
        pages.push(PageItem::Page(total_pages));
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Page};

    #[test]
    fn test_short_ranges_list_every_page() {
        for total in 0..=5 {
            let window = page_window(1, total);
            let expected: Vec<PageItem> = (1..=total).map(Page).collect();
            assert_eq!(window, expected, "total_pages = {}", total);
        }
    }

    #[test]
    fn test_first_page_of_ten() {
        assert_eq!(
            page_window(1, 10),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_last_page_of_ten() {
        assert_eq!(
            page_window(10, 10),
            vec![Page(1), Ellipsis, Page(9), Page(10)]
        );
    }

    #[test]
    fn test_middle_page_of_ten() {
        assert_eq!(
            page_window(5, 10),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_window_is_deterministic() {
        assert_eq!(page_window(7, 20), page_window(7, 20));
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_string(&page_window(5, 10)).unwrap();
        assert_eq!(json, r#"[1,"...",4,5,6,"...",10]"#);
    }
}
