//! Cell-domain selector resolution: composes the row and column domains.

use super::{dedup_first_wins, CellSelectorPlugin, ColumnSelector, RowSelector, ViewOptions};
use crate::grid::{Grid, NodeRef};
use datagrid_model::RowData;
use std::sync::Arc;

/// One resolved cell: a store row index and a store column position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub row: usize,
    pub column: usize,
}

impl CellIndex {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl From<(usize, usize)> for CellIndex {
    fn from((row, column): (usize, usize)) -> Self {
        Self { row, column }
    }
}

/// One cell-addressing value. Arrays resolve through [`Many`]: each member
/// resolves independently and the results union.
///
/// [`Many`]: CellSelector::Many
#[derive(Clone)]
pub enum CellSelector {
    /// Every cell of every candidate row.
    All,
    /// An explicit pair, validated against the row candidate set: a row
    /// filtered out under `record_set = Applied` rejects the pair.
    At(CellIndex),
    /// A structural node, mapped back through the registered
    /// [`crate::StructuralIndex`] and validated like an explicit pair.
    Node(NodeRef),
    /// Predicate over `(cell, raw row data)`, invoked for every cell of every
    /// candidate row.
    Matching(Arc<dyn Fn(CellIndex, &RowData) -> bool>),
    /// Cross product of an independently resolved row set and column set.
    /// Used when only one dimension is constrained, or neither.
    Cross {
        rows: RowSelector,
        columns: ColumnSelector,
    },
    Many(Vec<CellSelector>),
}

impl From<(usize, usize)> for CellSelector {
    fn from(pair: (usize, usize)) -> Self {
        CellSelector::At(pair.into())
    }
}

impl From<Vec<CellSelector>> for CellSelector {
    fn from(many: Vec<CellSelector>) -> Self {
        CellSelector::Many(many)
    }
}

impl Grid {
    /// Appends a cell-domain resolver plug-in, run on every resolved set.
    pub fn register_cell_selector_plugin(&mut self, plugin: CellSelectorPlugin) {
        self.cell_plugins.push(plugin);
    }

    /// Resolves a cell selector to `(row, column)` pairs under the view
    /// options.
    pub fn resolve_cells(
        &mut self,
        selector: &CellSelector,
        options: &ViewOptions,
    ) -> Vec<CellIndex> {
        let mut matches = Vec::new();
        self.resolve_cell_value(selector, options, &mut matches);
        dedup_first_wins(&mut matches);

        for plugin in self.cell_plugins.clone() {
            matches = plugin(options, matches);
        }
        matches
    }

    fn resolve_cell_value(
        &mut self,
        selector: &CellSelector,
        options: &ViewOptions,
        matches: &mut Vec<CellIndex>,
    ) {
        match selector {
            CellSelector::All => self.resolve_cell_value(
                &CellSelector::Cross {
                    rows: RowSelector::All,
                    columns: ColumnSelector::All,
                },
                options,
                matches,
            ),
            CellSelector::Cross { rows, columns } => {
                let rows = self.resolve_rows(rows, options);
                let columns = self.resolve_columns(columns, options);
                for &row in &rows {
                    for &column in &columns {
                        matches.push(CellIndex::new(row, column));
                    }
                }
            }
            CellSelector::At(cell) => {
                if self.validate_cell(*cell, options) {
                    matches.push(*cell);
                } else {
                    log::debug!(
                        "cell selector ({}, {}) is not in the candidate set",
                        cell.row,
                        cell.column
                    );
                }
            }
            CellSelector::Node(node) => {
                match self.structural.as_ref().and_then(|s| s.cell_of(*node)) {
                    Some((row, column)) => {
                        let cell = CellIndex::new(row, column);
                        if self.validate_cell(cell, options) {
                            matches.push(cell);
                        } else {
                            log::debug!("cell selector node {node:?} is not in the candidate set");
                        }
                    }
                    None => log::debug!("cell selector node {node:?} matched nothing"),
                }
            }
            CellSelector::Matching(predicate) => {
                let rows = self.row_candidates(options);
                let columns = self.columns.len();
                for row in rows {
                    let Some(record) = self.row(row) else { continue };
                    for column in 0..columns {
                        let cell = CellIndex::new(row, column);
                        if predicate(cell, &record.data) {
                            matches.push(cell);
                        }
                    }
                }
            }
            CellSelector::Many(values) => {
                for value in values {
                    self.resolve_cell_value(value, options, matches);
                }
            }
        }
    }

    fn validate_cell(&mut self, cell: CellIndex, options: &ViewOptions) -> bool {
        cell.column < self.columns.len() && self.row_candidates(options).contains(&cell.row)
    }
}
