use std::ops::Range;

pub fn total_pages(filtered_count: usize, page_size: usize) -> usize {
    if filtered_count == 0 {
        0
    } else {
        filtered_count.div_ceil(page_size.max(1))
    }
}

/// Index range of a 1-based page. Pages outside `[1, total_pages]` give an
/// empty range rather than an error.
pub fn page_range(len: usize, current_page: usize, page_size: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    if current_page == 0 {
        return 0..0;
    }
    let start = (current_page - 1).saturating_mul(page_size).min(len);
    let end = current_page.saturating_mul(page_size).min(len);
    start..end
}
