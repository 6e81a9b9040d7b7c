//! Fixed-size pagination over ordered result rows

/// Default number of rows shown per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A window onto one page of an ordered slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow<'a, T> {
    /// Rows on this page
    pub rows: &'a [T],
    /// Clamped 1-based page number
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    /// 1-based index of the first row on this page, 0 when there are no rows
    pub first_row: usize,
    /// 1-based index of the last row on this page, 0 when there are no rows
    pub last_row: usize,
}

impl<T> PageWindow<'_, T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Number of pages needed for `row_count` rows, never less than one.
pub fn total_pages(row_count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    row_count.div_ceil(page_size).max(1)
}

/// Clamp a possibly out-of-range page number into `[1, total_pages]`.
pub fn clamp_page(page: i64, row_count: usize, page_size: usize) -> usize {
    let last = total_pages(row_count, page_size) as i64;
    page.clamp(1, last) as usize
}

/// Slice `rows` into the page identified by `page`.
///
/// Out-of-range pages are clamped rather than rejected, and an empty input
/// yields a single empty page.
pub fn paginate<T>(rows: &[T], page_size: usize, page: i64) -> PageWindow<'_, T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(rows.len(), page_size);
    let page = clamp_page(page, rows.len(), page_size);

    let start = ((page - 1) * page_size).min(rows.len());
    let end = (start + page_size).min(rows.len());
    let slice = &rows[start..end];

    let (first_row, last_row) = if slice.is_empty() {
        (0, 0)
    } else {
        (start + 1, end)
    };

    PageWindow {
        rows: slice,
        page,
        total_pages,
        total_rows: rows.len(),
        first_row,
        last_row,
    }
}
