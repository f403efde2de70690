//! Row-domain selector resolution.

use super::{dedup_first_wins, PageScope, RecordSet, RowSelectorPlugin, SelectOrder, ViewOptions};
use crate::grid::{Grid, NodeRef};
use ahash::{AHashMap, AHashSet};
use datagrid_model::{RowData, SortDirection};
use std::sync::Arc;

/// One row-addressing value. Arrays of values resolve through [`Many`]:
/// each member resolves independently and the results union.
///
/// [`Many`]: RowSelector::Many
#[derive(Clone)]
pub enum RowSelector {
    /// The full candidate set under the view options.
    All,
    /// A store row index; negative counts from the end of the candidate set.
    Index(i64),
    /// An external row identifier.
    Id(String),
    /// A structural node, mapped back through the registered
    /// [`crate::StructuralIndex`].
    Node(NodeRef),
    /// Predicate over `(store index, raw data, structural node)`, invoked
    /// once per candidate.
    Matching(Arc<dyn Fn(usize, &RowData, Option<NodeRef>) -> bool>),
    Many(Vec<RowSelector>),
}

impl From<usize> for RowSelector {
    fn from(index: usize) -> Self {
        RowSelector::Index(index as i64)
    }
}

impl From<i64> for RowSelector {
    fn from(index: i64) -> Self {
        RowSelector::Index(index)
    }
}

/// Strings address rows by external identifier; a leading `#` (the
/// conventional reserved prefix) is stripped.
impl From<&str> for RowSelector {
    fn from(id: &str) -> Self {
        RowSelector::Id(id.strip_prefix('#').unwrap_or(id).to_string())
    }
}

impl From<NodeRef> for RowSelector {
    fn from(node: NodeRef) -> Self {
        RowSelector::Node(node)
    }
}

impl From<Vec<RowSelector>> for RowSelector {
    fn from(many: Vec<RowSelector>) -> Self {
        RowSelector::Many(many)
    }
}

impl Grid {
    /// Appends a row-domain resolver plug-in, run on every resolved set.
    pub fn register_row_selector_plugin(&mut self, plugin: RowSelectorPlugin) {
        self.row_plugins.push(plugin);
    }

    /// The row universe a resolution call operates over, in the requested
    /// order.
    pub(crate) fn row_candidates(&mut self, options: &ViewOptions) -> Vec<usize> {
        // Page restriction overrides record set and order wholesale.
        if options.page == PageScope::Current {
            return self.display_window().to_vec();
        }

        let base: Vec<usize> = match options.order {
            SelectOrder::Current => self.master.clone(),
            SelectOrder::Original => {
                let mut rows = self.master.clone();
                rows.sort_unstable();
                rows
            }
            SelectOrder::Column(column) => match self.sort_preview(column, SortDirection::Asc) {
                Ok(rows) => rows,
                Err(err) => {
                    log::debug!("selector order column unusable: {err}");
                    self.master.clone()
                }
            },
        };

        match options.record_set {
            RecordSet::None => base,
            RecordSet::Applied => {
                let applied: AHashSet<usize> = self.display.iter().copied().collect();
                base.into_iter().filter(|r| applied.contains(r)).collect()
            }
            RecordSet::Removed => {
                let applied: AHashSet<usize> = self.display.iter().copied().collect();
                base.into_iter().filter(|r| !applied.contains(r)).collect()
            }
        }
    }

    /// Resolves a row selector to store indices under the view options.
    pub fn resolve_rows(&mut self, selector: &RowSelector, options: &ViewOptions) -> Vec<usize> {
        let candidates = self.row_candidates(options);
        let mut matches = Vec::new();
        self.resolve_row_value(selector, &candidates, &mut matches);
        dedup_first_wins(&mut matches);

        for plugin in self.row_plugins.clone() {
            matches = plugin(options, matches);
        }

        // Individually addressed rows come back in candidate order when the
        // caller asked for the current order.
        if options.order == SelectOrder::Current || options.page == PageScope::Current {
            let positions: AHashMap<usize, usize> = candidates
                .iter()
                .enumerate()
                .map(|(position, &row)| (row, position))
                .collect();
            matches.sort_by_key(|row| positions.get(row).copied().unwrap_or(usize::MAX));
        }
        matches
    }

    fn resolve_row_value(
        &self,
        selector: &RowSelector,
        candidates: &[usize],
        matches: &mut Vec<usize>,
    ) {
        match selector {
            RowSelector::All => matches.extend_from_slice(candidates),
            RowSelector::Index(index) => {
                if *index < 0 {
                    let offset = candidates.len() as i64 + index;
                    match usize::try_from(offset).ok().and_then(|o| candidates.get(o)) {
                        Some(&row) => matches.push(row),
                        None => log::debug!("row selector {index} is before the candidate start"),
                    }
                } else {
                    let row = *index as usize;
                    if candidates.contains(&row) {
                        matches.push(row);
                    } else {
                        log::debug!("row selector {row} is not in the candidate set");
                    }
                }
            }
            RowSelector::Id(id) => match self.row_by_id(id) {
                Some(row) if candidates.contains(&row) => matches.push(row),
                _ => log::debug!("row selector id '{id}' matched nothing"),
            },
            RowSelector::Node(node) => {
                match self.structural.as_ref().and_then(|s| s.row_of(*node)) {
                    Some(row) if candidates.contains(&row) => matches.push(row),
                    _ => log::debug!("row selector node {node:?} matched nothing"),
                }
            }
            RowSelector::Matching(predicate) => {
                for &row in candidates {
                    let Some(record) = self.row(row) else { continue };
                    let node = self.structural.as_ref().and_then(|s| s.node_of_row(row));
                    if predicate(row, &record.data, node) {
                        matches.push(row);
                    }
                }
            }
            RowSelector::Many(values) => {
                for value in values {
                    self.resolve_row_value(value, candidates, matches);
                }
            }
        }
    }
}
