//! Pure page-window math over an ordered sequence.
//!
//! No network, no index: just a page size, a zero-based page number and the
//! length of whatever is being paged.

use std::num::NonZeroUsize;

/// Paging state for page-turn navigation.
///
/// `current_page` only moves forward when a next window is known to exist
/// and only moves backward while above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: NonZeroUsize,
    current_page: usize,
}

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(size) => size,
    None => unreachable!(),
};

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            current_page: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Back to the first page.
    pub fn reset(&mut self) {
        self.current_page = 0;
    }

    /// The current window of `items`, clipped to bounds. Empty when the
    /// window starts past the end.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.current_page.saturating_mul(self.page_size());
        if start >= items.len() {
            return &[];
        }
        let end = items.len().min(start + self.page_size());
        &items[start..end]
    }

    /// Whether a window after the current one exists locally.
    pub fn has_next(&self, total_count: usize) -> bool {
        (self.current_page + 1).saturating_mul(self.page_size()) < total_count
    }

    /// Page count for a fixed-size list; never less than one.
    pub fn total_pages(&self, total_count: usize) -> usize {
        total_count.div_ceil(self.page_size()).max(1)
    }

    /// Advance if a next window exists. Returns whether it advanced.
    pub fn step_forward_if_possible(&mut self, total_count: usize) -> bool {
        if !self.has_next(total_count) {
            return false;
        }
        self.current_page += 1;
        true
    }

    /// Step back unless already on the first page. Returns whether it moved.
    pub fn step_backward(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page -= 1;
        true
    }
}
