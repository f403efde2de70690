//! Selector resolution: turns heterogeneous row/column/cell addressing into
//! concrete, de-duplicated index sets.
//!
//! The three domains share one outer algorithm (per-value resolution, union,
//! first-occurrence dedup, plug-in chain) and one view-options vocabulary;
//! the per-domain rules live in [`row`], [`column`] and [`cell`].
//!
//! Resolution never fails: stale nodes, unknown identifiers, out-of-range
//! indices and tombstoned rows all degrade to "nothing matched" for that
//! value, so a malformed selector inside a batch never aborts the batch.

mod cell;
mod column;
mod row;

pub use cell::{CellIndex, CellSelector};
pub use column::ColumnSelector;
pub use row::RowSelector;

use ahash::AHashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Which slice of the row universe to resolve against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RecordSet {
    /// Every live row, filtered or not.
    #[default]
    None,
    /// Only rows passing the active searches.
    Applied,
    /// Only rows failing the active searches.
    Removed,
}

/// Row order of the resolved set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectOrder {
    /// Last-sorted order, as displayed.
    #[default]
    Current,
    /// Raw insertion order, ignoring the active sort.
    Original,
    /// Freshly sorted ascending by the given column, without touching the
    /// active sort state.
    Column(usize),
}

/// Page restriction of the resolved set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PageScope {
    #[default]
    All,
    /// Only rows inside the active page window. Forces `order = Current` and
    /// `record_set = Applied` whatever else was requested: the current page
    /// only exists relative to what is actually displayed.
    Current,
}

/// Ordering of column-domain results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColumnOrder {
    /// The order the selector produced the matches in.
    #[default]
    Implied,
    /// Ascending by store column position.
    Index,
}

/// View options recognized on every resolution call, in every domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ViewOptions {
    pub record_set: RecordSet,
    pub order: SelectOrder,
    pub page: PageScope,
    pub column_order: ColumnOrder,
}

impl ViewOptions {
    pub fn record_set(mut self, record_set: RecordSet) -> Self {
        self.record_set = record_set;
        self
    }

    pub fn order(mut self, order: SelectOrder) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, page: PageScope) -> Self {
        self.page = page;
        self
    }

    pub fn column_order(mut self, column_order: ColumnOrder) -> Self {
        self.column_order = column_order;
        self
    }
}

/// Registered post-resolution hook for the row domain: receives the resolved
/// set and returns the set to use instead.
pub type RowSelectorPlugin = Arc<dyn Fn(&ViewOptions, Vec<usize>) -> Vec<usize>>;
pub type ColumnSelectorPlugin = Arc<dyn Fn(&ViewOptions, Vec<usize>) -> Vec<usize>>;
pub type CellSelectorPlugin = Arc<dyn Fn(&ViewOptions, Vec<CellIndex>) -> Vec<CellIndex>>;

/// First occurrence wins.
pub(crate) fn dedup_first_wins<T: Eq + Hash + Copy>(items: &mut Vec<T>) {
    let mut seen = AHashSet::with_capacity(items.len());
    items.retain(|&item| seen.insert(item));
}
