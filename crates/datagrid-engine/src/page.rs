//! The page window: a start offset and length clamped onto the filtered
//! order. Paging is presentation state; it never changes which rows exist or
//! how they are ordered.

use crate::grid::Grid;
use datagrid_model::{PageLength, PageState};

/// Snapshot of the page window over the filtered order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    /// Offset of the first displayed row within the filtered order.
    pub start: usize,
    /// One past the last displayed row within the filtered order.
    pub end: usize,
    pub length: PageLength,
    /// Zero-based page number.
    pub page: usize,
    pub pages: usize,
    /// Rows passing the active searches.
    pub filtered_rows: usize,
    /// Live rows regardless of filtering.
    pub total_rows: usize,
}

impl Grid {
    pub fn page_state(&self) -> PageState {
        self.page
    }

    /// One past the last filtered-order position on the current page.
    pub(crate) fn display_end(&self) -> usize {
        match self.page.length {
            PageLength::All => self.display.len(),
            PageLength::Rows(0) => self.display.len(),
            PageLength::Rows(n) => (self.page.start + n).min(self.display.len()),
        }
    }

    /// The filtered rows on the current page, in display order.
    pub fn display_window(&self) -> &[usize] {
        &self.display[self.page.start.min(self.display.len())..self.display_end()]
    }

    pub fn page_info(&self) -> PageInfo {
        let filtered = self.display.len();
        let total = self.master.len();
        match self.page.length {
            PageLength::All | PageLength::Rows(0) => PageInfo {
                start: 0,
                end: filtered,
                length: self.page.length,
                page: 0,
                pages: 1,
                filtered_rows: filtered,
                total_rows: total,
            },
            PageLength::Rows(n) => PageInfo {
                start: self.page.start,
                end: self.display_end(),
                length: self.page.length,
                page: self.page.start / n,
                pages: filtered.div_ceil(n).max(1),
                filtered_rows: filtered,
                total_rows: total,
            },
        }
    }

    /// Jumps the window to the given offset in the filtered order, clamped to
    /// the last non-empty page.
    pub fn set_page_start(&mut self, start: usize) {
        self.page.start = start;
        self.page_overflow();
    }

    /// Changes the page length, keeping the current top row on screen: the
    /// new start is the boundary of the new-length page containing it.
    pub fn set_page_length(&mut self, length: PageLength) {
        if let PageLength::Rows(n) = length {
            if n > 0 {
                self.page.start = (self.page.start / n) * n;
            }
        }
        self.page.length = length;
        self.page_overflow();
    }

    /// Clamps the window after the filtered order shrank: an out-of-range
    /// start falls back to the last non-empty page, or 0 when nothing
    /// remains.
    pub(crate) fn page_overflow(&mut self) {
        match self.page.length {
            PageLength::All | PageLength::Rows(0) => self.page.start = 0,
            PageLength::Rows(n) => {
                if self.display.is_empty() {
                    self.page.start = 0;
                } else if self.page.start >= self.display.len() {
                    self.page.start = ((self.display.len() - 1) / n) * n;
                }
            }
        }
    }
}
