//! Column-domain selector resolution.

use super::{dedup_first_wins, ColumnOrder, ColumnSelectorPlugin, ViewOptions};
use crate::column::Column;
use crate::grid::{Grid, NodeRef};
use std::sync::Arc;

/// One column-addressing value. Arrays resolve through [`Many`]: each member
/// resolves independently and the results union.
///
/// [`Many`]: ColumnSelector::Many
#[derive(Clone)]
pub enum ColumnSelector {
    /// Every column.
    All,
    /// A store column position; negative counts from the last column.
    Index(i64),
    /// Matched against column names first; when no name matches, against
    /// titles. Either way every matching column is returned.
    Named(String),
    /// The n-th visible column.
    VisibleIndex(usize),
    /// A structural node, mapped back through the registered
    /// [`crate::StructuralIndex`].
    Node(NodeRef),
    /// Predicate over `(store position, column)`, invoked once per column.
    Matching(Arc<dyn Fn(usize, &Column) -> bool>),
    Many(Vec<ColumnSelector>),
}

impl From<usize> for ColumnSelector {
    fn from(index: usize) -> Self {
        ColumnSelector::Index(index as i64)
    }
}

impl From<i64> for ColumnSelector {
    fn from(index: i64) -> Self {
        ColumnSelector::Index(index)
    }
}

impl From<&str> for ColumnSelector {
    fn from(name: &str) -> Self {
        ColumnSelector::Named(name.to_string())
    }
}

impl From<NodeRef> for ColumnSelector {
    fn from(node: NodeRef) -> Self {
        ColumnSelector::Node(node)
    }
}

impl From<Vec<ColumnSelector>> for ColumnSelector {
    fn from(many: Vec<ColumnSelector>) -> Self {
        ColumnSelector::Many(many)
    }
}

impl Grid {
    /// Appends a column-domain resolver plug-in, run on every resolved set.
    pub fn register_column_selector_plugin(&mut self, plugin: ColumnSelectorPlugin) {
        self.column_plugins.push(plugin);
    }

    /// Resolves a column selector to store column positions.
    pub fn resolve_columns(
        &mut self,
        selector: &ColumnSelector,
        options: &ViewOptions,
    ) -> Vec<usize> {
        let mut matches = Vec::new();
        self.resolve_column_value(selector, &mut matches);
        dedup_first_wins(&mut matches);

        for plugin in self.column_plugins.clone() {
            matches = plugin(options, matches);
        }

        if options.column_order == ColumnOrder::Index {
            matches.sort_unstable();
        }
        matches
    }

    fn resolve_column_value(&self, selector: &ColumnSelector, matches: &mut Vec<usize>) {
        let count = self.columns.len();
        match selector {
            ColumnSelector::All => matches.extend(0..count),
            ColumnSelector::Index(index) => {
                let resolved = if *index < 0 {
                    usize::try_from(count as i64 + index).ok()
                } else {
                    Some(*index as usize)
                };
                match resolved.filter(|&c| c < count) {
                    Some(column) => matches.push(column),
                    None => log::debug!("column selector {index} is out of range"),
                }
            }
            ColumnSelector::Named(pattern) => {
                let by_name: Vec<usize> = (0..count)
                    .filter(|&c| self.columns[c].name() == Some(pattern.as_str()))
                    .collect();
                if by_name.is_empty() {
                    let by_title: Vec<usize> = (0..count)
                        .filter(|&c| self.columns[c].title() == Some(pattern.as_str()))
                        .collect();
                    if by_title.is_empty() {
                        log::debug!("column selector '{pattern}' matched nothing");
                    }
                    matches.extend(by_title);
                } else {
                    matches.extend(by_name);
                }
            }
            ColumnSelector::VisibleIndex(visible) => match self.visible_to_column(*visible) {
                Some(column) => matches.push(column),
                None => log::debug!("no visible column at position {visible}"),
            },
            ColumnSelector::Node(node) => {
                match self.structural.as_ref().and_then(|s| s.column_of(*node)) {
                    Some(column) if column < count => matches.push(column),
                    _ => log::debug!("column selector node {node:?} matched nothing"),
                }
            }
            ColumnSelector::Matching(predicate) => {
                matches.extend((0..count).filter(|&c| predicate(c, &self.columns[c])));
            }
            ColumnSelector::Many(values) => {
                for value in values {
                    self.resolve_column_value(value, matches);
                }
            }
        }
    }
}
