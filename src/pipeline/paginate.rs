//! Page slicing and the numbered-button window of pagination controls.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page actually served after clamping.
    pub page: usize,
    pub total_pages: usize,
    /// 0-based index of the first item on the page.
    pub start_index: usize,
    /// 0-based exclusive end index.
    pub end_index: usize,
    pub total_items: usize,
    pub page_size: usize,
}

/// Number of pages for `total` items; zero for an empty set.
pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Clamp `page` into `[1, total_pages]`, or 1 when there are no pages.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Slice `items` to one page. Out-of-range pages are clamped, so `items` is
/// empty only when the input is.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let pages = total_pages(total, page_size);
    let page = clamp_page(page, pages);
    let start = ((page - 1) * page_size).min(total);
    let end = (start + page_size).min(total);
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages: pages,
        start_index: start,
        end_index: end,
        total_items: total,
        page_size,
    }
}

/// Page numbers to show as buttons: `page ± radius`, clipped to the valid
/// range. Empty when there are no pages.
pub fn page_window(page: usize, total_pages: usize, radius: usize) -> Vec<usize> {
    if total_pages == 0 {
        return Vec::new();
    }
    let page = clamp_page(page, total_pages);
    let first = page.saturating_sub(radius).max(1);
    let last = (page + radius).min(total_pages);
    (first..=last).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beyond_range_clamps_to_last_page() {
        let items: Vec<u32> = (1..=25).collect();
        let p = paginate(&items, 999, 10);
        assert_eq!(p.page, 3);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.items, [21, 22, 23, 24, 25]);
        assert_eq!((p.start_index, p.end_index), (20, 25));
    }

    #[test]
    fn first_page_and_zero_page() {
        let items: Vec<u32> = (1..=25).collect();
        let p = paginate(&items, 0, 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.items.len(), 10);
        assert_eq!(p.items[0], 1);
    }

    #[test]
    fn empty_input() {
        let p = paginate::<u32>(&[], 5, 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert!(p.items.is_empty());
        assert_eq!((p.start_index, p.end_index), (0, 0));
    }

    #[test]
    fn zero_page_size_treated_as_one() {
        let p = paginate(&[1, 2, 3], 2, 0);
        assert_eq!(p.page_size, 1);
        assert_eq!(p.items, [2]);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn window() {
        assert_eq!(page_window(1, 10, 2), [1, 2, 3]);
        assert_eq!(page_window(5, 10, 2), [3, 4, 5, 6, 7]);
        assert_eq!(page_window(10, 10, 2), [8, 9, 10]);
        assert_eq!(page_window(50, 4, 2), [2, 3, 4]);
        assert!(page_window(1, 0, 2).is_empty());
    }
}
