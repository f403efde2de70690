use crate::cache::InvalidateSource;
use crate::column::{Column, ColumnSpec};
use crate::row::{RowRecord, RowSource};
use crate::search::FixedFilter;
use crate::select::{CellSelectorPlugin, ColumnSelectorPlugin, RowSelectorPlugin};
use crate::sort::SortFixed;
use crate::types::TypeRegistry;
use ahash::AHashMap;
use datagrid_model::{PageState, RowData, SearchState, SortEntry, Value};
use thiserror::Error;

/// Errors from store mutations and lookups.
///
/// Lookups that can reasonably miss return `Option` instead; selector
/// resolution absorbs misses entirely and returns empty sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("row index {0} is out of range or removed")]
    RowNotFound(usize),
    #[error("column index {0} is out of range")]
    ColumnNotFound(usize),
    #[error("column {0} is not orderable")]
    ColumnNotOrderable(usize),
}

/// Opaque handle to a structural node owned by the rendering collaborator.
///
/// The engine never inspects the handle; it only maps it back to row, column
/// or cell indices through a registered [`StructuralIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u64);

/// Reverse lookup from structural nodes to store indices, maintained by the
/// rendering collaborator and consumed read-only here.
pub trait StructuralIndex {
    fn row_of(&self, node: NodeRef) -> Option<usize>;
    fn column_of(&self, node: NodeRef) -> Option<usize>;
    fn cell_of(&self, node: NodeRef) -> Option<(usize, usize)>;

    /// Forward mapping used when handing a row's node to selector predicates.
    fn node_of_row(&self, row: usize) -> Option<NodeRef> {
        let _ = row;
        None
    }

    /// Re-reads a row's raw data from the structural source. Used when
    /// invalidating externally sourced rows.
    fn read_row(&self, row: usize) -> Option<RowData> {
        let _ = row;
        None
    }
}

/// Engine configuration, fixed at construction.
#[derive(Clone, Debug)]
pub struct GridOptions {
    /// Decimal point character for numeric type detection and sorting, when
    /// the data uses something other than `.`.
    pub decimal: Option<char>,
    /// Reverse the raw-position tie-break when the first sort key descends,
    /// making a descending sort the exact mirror of its ascending
    /// counterpart, tied rows included, and repeated reversal a round trip.
    pub order_desc_reverse: bool,
    /// Key under which keyed raw data carries the row's external identifier.
    pub row_id_key: Option<String>,
    /// Automatic column type detection. Disable when data shapes make
    /// detection unreliable; undetected columns sort as `string`.
    pub type_detection: bool,
    /// Master switch for the sort pass.
    pub ordering: bool,
    /// Allow multi-key sorts from [`Grid::cycle_sort`] append requests.
    pub multi_sort: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            decimal: None,
            order_desc_reverse: true,
            row_id_key: None,
            type_detection: true,
            ordering: true,
            multi_sort: true,
        }
    }
}

/// The tabular data engine instance: row/column store, derived display
/// arrays, caches and registries.
pub struct Grid {
    pub(crate) rows: Vec<Option<RowRecord>>,
    pub(crate) columns: Vec<Column>,
    /// External identifier index. Last write wins on duplicates.
    pub(crate) ids: AHashMap<String, usize>,
    /// Every live row index, in last-sorted order.
    pub(crate) master: Vec<usize>,
    /// Subsequence of `master` passing the active searches.
    pub(crate) display: Vec<usize>,
    pub(crate) sort_spec: Vec<SortEntry>,
    pub(crate) sort_fixed: SortFixed,
    pub(crate) search_state: SearchState,
    pub(crate) fixed_filters: Vec<(String, FixedFilter)>,
    pub(crate) page: PageState,
    pub(crate) options: GridOptions,
    pub(crate) types: TypeRegistry,
    pub(crate) structural: Option<Box<dyn StructuralIndex>>,
    pub(crate) row_plugins: Vec<RowSelectorPlugin>,
    pub(crate) column_plugins: Vec<ColumnSelectorPlugin>,
    pub(crate) cell_plugins: Vec<CellSelectorPlugin>,
}

impl Grid {
    pub fn new() -> Self {
        Self::with_options(GridOptions::default())
    }

    pub fn with_options(options: GridOptions) -> Self {
        Self::with_registry(options, TypeRegistry::with_builtins())
    }

    /// Grid with a caller-built type registry. Registries are instance
    /// state: two grids never share registrations.
    pub fn with_registry(options: GridOptions, types: TypeRegistry) -> Self {
        Self {
            rows: Vec::new(),
            columns: Vec::new(),
            ids: AHashMap::new(),
            master: Vec::new(),
            display: Vec::new(),
            sort_spec: Vec::new(),
            sort_fixed: SortFixed::default(),
            search_state: SearchState::default(),
            fixed_filters: Vec::new(),
            page: PageState::default(),
            options,
            types,
            structural: None,
            row_plugins: Vec::new(),
            column_plugins: Vec::new(),
            cell_plugins: Vec::new(),
        }
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Registers the structural reverse lookup used by node selectors and
    /// external-row invalidation.
    pub fn set_structural_index(&mut self, index: Box<dyn StructuralIndex>) {
        self.structural = Some(index);
    }

    // -----------------------------------------------------------------------
    // Columns
    // -----------------------------------------------------------------------

    /// Appends a column descriptor. Columns can only be appended, never
    /// removed or reordered in storage, so column indices stay stable.
    pub fn add_column(&mut self, spec: ColumnSpec) -> usize {
        let index = self.columns.len();
        self.columns.push(Column::new(spec));

        // Per-row cache vectors are sized per column, so they are rebuilt.
        for row in self.rows.iter_mut().flatten() {
            row.caches.clear();
        }
        index
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, column: usize) -> Option<&Column> {
        self.columns.get(column)
    }

    /// Resolved type name for a column, running detection if needed.
    pub fn column_type(&mut self, column: usize) -> Result<String, GridError> {
        if column >= self.columns.len() {
            return Err(GridError::ColumnNotFound(column));
        }
        self.detect_types();
        Ok(self.columns[column].type_name().to_string())
    }

    /// Declares a column's type, overriding detection.
    ///
    /// The type drives sort and search key formatting, so keys derived under
    /// the previous type are dropped.
    pub fn set_column_type(
        &mut self,
        column: usize,
        type_name: impl Into<String>,
    ) -> Result<(), GridError> {
        let col = self
            .columns
            .get_mut(column)
            .ok_or(GridError::ColumnNotFound(column))?;
        col.spec.declared_type = Some(type_name.into());
        col.detected_type = None;
        col.widest_display = None;
        for record in self.rows.iter_mut().flatten() {
            if let Some(key) = record.caches.sort.get_mut(column) {
                *key = None;
            }
            record.caches.search = None;
            record.caches.search_row = None;
        }
        Ok(())
    }

    pub fn column_visible(&self, column: usize) -> Option<bool> {
        self.columns.get(column).map(|c| c.visible())
    }

    /// Shows or hides a column. Visibility is presentation state only; it
    /// never affects column indices.
    pub fn set_column_visible(&mut self, column: usize, visible: bool) -> Result<(), GridError> {
        let col = self
            .columns
            .get_mut(column)
            .ok_or(GridError::ColumnNotFound(column))?;
        col.spec.visible = visible;
        Ok(())
    }

    /// Store column positions of the visible columns, in order.
    pub(crate) fn visible_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible())
            .map(|(i, _)| i)
            .collect()
    }

    /// Maps a visible column position to its store column position.
    pub fn visible_to_column(&self, visible: usize) -> Option<usize> {
        self.visible_columns().get(visible).copied()
    }

    /// Maps a store column position to its visible position. `None` for
    /// hidden columns.
    pub fn column_to_visible(&self, column: usize) -> Option<usize> {
        self.visible_columns().iter().position(|&c| c == column)
    }

    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    /// Adds a row and returns its store index. Indices are assigned at
    /// creation and never reused while the store lives.
    pub fn add_row(&mut self, data: RowData) -> usize {
        let id = self.extract_id(&data);
        self.insert_row(data, RowSource::Data, id)
    }

    /// Adds a row with an explicit external identifier.
    pub fn add_row_with_id(&mut self, data: RowData, id: impl Into<String>) -> usize {
        self.insert_row(data, RowSource::Data, Some(id.into()))
    }

    /// Adds a row whose raw data mirrors an external structural source, so
    /// invalidation can re-read it through the structural index.
    pub fn add_row_external(&mut self, data: RowData) -> usize {
        let id = self.extract_id(&data);
        self.insert_row(data, RowSource::External, id)
    }

    /// Bulk ingestion; returns the assigned indices.
    pub fn add_rows(&mut self, rows: impl IntoIterator<Item = RowData>) -> Vec<usize> {
        rows.into_iter().map(|data| self.add_row(data)).collect()
    }

    fn extract_id(&self, data: &RowData) -> Option<String> {
        let key = self.options.row_id_key.as_deref()?;
        match data.key(key) {
            Some(Value::Text(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(Value::Number(*n).to_string()),
            _ => None,
        }
    }

    fn insert_row(&mut self, data: RowData, source: RowSource, id: Option<String>) -> usize {
        let index = self.rows.len();
        if let Some(id) = &id {
            if let Some(prior) = self.ids.insert(id.clone(), index) {
                log::warn!("duplicate row id '{id}' (rows {prior} and {index}); last write wins");
            }
        }
        self.rows.push(Some(RowRecord::new(data, source, id)));
        self.master.push(index);

        // New data invalidates detected column types.
        for column in &mut self.columns {
            column.detected_type = None;
            column.widest_display = None;
        }
        index
    }

    /// Removes a row by tombstoning its slot. The index is never reassigned,
    /// so previously handed-out indices stay stable.
    pub fn remove_row(&mut self, row: usize) -> Result<(), GridError> {
        let record = self
            .rows
            .get_mut(row)
            .and_then(Option::take)
            .ok_or(GridError::RowNotFound(row))?;

        if let Some(id) = &record.id {
            if self.ids.get(id) == Some(&row) {
                self.ids.remove(id);
            }
        }
        self.master.retain(|&r| r != row);
        self.display.retain(|&r| r != row);
        self.page_overflow();
        Ok(())
    }

    /// Drops every row, the identifier index and the display arrays. A fresh
    /// session: row indices restart at 0.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.ids.clear();
        self.master.clear();
        self.display.clear();
        for column in &mut self.columns {
            column.detected_type = None;
            column.widest_display = None;
        }
    }

    pub(crate) fn row(&self, row: usize) -> Option<&RowRecord> {
        self.rows.get(row).and_then(Option::as_ref)
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> Option<&mut RowRecord> {
        self.rows.get_mut(row).and_then(Option::as_mut)
    }

    /// A row's raw data. `None` for tombstoned or out-of-range indices.
    pub fn row_data(&self, row: usize) -> Option<&RowData> {
        self.row(row).map(|r| &r.data)
    }

    /// Replaces a row's raw data and invalidates its derived caches.
    pub fn set_row_data(&mut self, row: usize, data: RowData) -> Result<(), GridError> {
        {
            let record = self.row_mut(row).ok_or(GridError::RowNotFound(row))?;
            record.data = data;
        }
        self.invalidate(row, None, InvalidateSource::Data);
        Ok(())
    }

    /// Writes a raw cell value through the column's accessor.
    ///
    /// Derived caches are deliberately left untouched: sort/search/display
    /// values keep reflecting the data as of the last invalidate or draw, not
    /// the last write. Callers wanting the caches refreshed invalidate the
    /// row explicitly or request a draw.
    pub fn set_cell_raw(&mut self, row: usize, column: usize, value: Value) -> Result<(), GridError> {
        let data_source = self
            .columns
            .get(column)
            .ok_or(GridError::ColumnNotFound(column))?
            .spec
            .data
            .clone();
        let record = self.row_mut(row).ok_or(GridError::RowNotFound(row))?;
        if !data_source.set(&mut record.data, value) {
            log::warn!("cell write dropped: column {column} has no write path");
        }
        Ok(())
    }

    /// Looks up a row by its external identifier.
    pub fn row_by_id(&self, id: &str) -> Option<usize> {
        self.ids.get(id).copied().filter(|&row| self.row(row).is_some())
    }

    /// A row's external identifier, if any.
    pub fn row_id(&self, row: usize) -> Option<&str> {
        self.row(row).and_then(|r| r.id.as_deref())
    }

    /// Number of live rows.
    pub fn row_count(&self) -> usize {
        self.master.len()
    }

    // -----------------------------------------------------------------------
    // Display pipeline
    // -----------------------------------------------------------------------

    /// Every live row index, in last-sorted order.
    pub fn master_order(&self) -> &[usize] {
        &self.master
    }

    /// The rows currently passing the active searches, in display order.
    pub fn display_order(&self) -> &[usize] {
        &self.display
    }

    /// Runs the display pipeline: type detection, the sort pass over the
    /// master order, then the filter pass rebuilding the filtered order and
    /// clamping the page window.
    ///
    /// Collaborators batching many mutations should call this once at the
    /// end rather than after each mutation.
    pub fn draw(&mut self) {
        self.detect_types();
        if self.options.ordering {
            self.sort_pass();
        }
        self.filter_pass();
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnSpec;
    use pretty_assertions::assert_eq;

    fn positional_grid(columns: usize) -> Grid {
        let mut grid = Grid::new();
        for i in 0..columns {
            grid.add_column(ColumnSpec::positional(i));
        }
        grid
    }

    fn row(values: &[&str]) -> RowData {
        RowData::Positional(values.iter().map(|v| Value::from(*v)).collect())
    }

    #[test]
    fn row_indices_are_assigned_sequentially_and_never_reused() {
        let mut grid = positional_grid(1);
        for i in 0..10 {
            assert_eq!(grid.add_row(row(&[&i.to_string()])), i);
        }

        grid.remove_row(5).unwrap();
        assert_eq!(grid.add_row(row(&["new"])), 10);
        assert!(!grid.master_order().contains(&5));
        assert_eq!(grid.row_data(5), None);
        assert_eq!(grid.row_count(), 10);
    }

    #[test]
    fn removing_a_removed_row_is_not_found() {
        let mut grid = positional_grid(1);
        grid.add_row(row(&["a"]));
        grid.remove_row(0).unwrap();
        assert_eq!(grid.remove_row(0), Err(GridError::RowNotFound(0)));
        assert_eq!(grid.remove_row(7), Err(GridError::RowNotFound(7)));
    }

    #[test]
    fn external_ids_resolve_and_unregister_on_remove() {
        let mut grid = positional_grid(1);
        grid.add_row_with_id(row(&["a"]), "r-a");
        grid.add_row_with_id(row(&["b"]), "r-b");

        assert_eq!(grid.row_by_id("r-b"), Some(1));
        grid.remove_row(1).unwrap();
        assert_eq!(grid.row_by_id("r-b"), None);
        assert_eq!(grid.row_by_id("r-a"), Some(0));
    }

    #[test]
    fn duplicate_ids_last_write_wins() {
        let mut grid = positional_grid(1);
        grid.add_row_with_id(row(&["a"]), "dup");
        grid.add_row_with_id(row(&["b"]), "dup");
        assert_eq!(grid.row_by_id("dup"), Some(1));
    }

    #[test]
    fn id_extracted_from_keyed_data() {
        let mut grid = Grid::with_options(GridOptions {
            row_id_key: Some("id".to_string()),
            ..GridOptions::default()
        });
        grid.add_column(ColumnSpec::keyed("name"));

        let mut data = std::collections::BTreeMap::new();
        data.insert("id".to_string(), Value::from("row-9"));
        data.insert("name".to_string(), Value::from("x"));
        grid.add_row(RowData::Keyed(data));

        assert_eq!(grid.row_by_id("row-9"), Some(0));
    }

    #[test]
    fn clear_restarts_indices_at_zero() {
        let mut grid = positional_grid(1);
        grid.add_row_with_id(row(&["a"]), "a");
        grid.add_row(row(&["b"]));
        grid.clear();

        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.row_by_id("a"), None);
        assert_eq!(grid.add_row(row(&["fresh"])), 0);
    }

    #[test]
    fn visible_translation_skips_hidden_columns() {
        let mut grid = positional_grid(4);
        grid.set_column_visible(1, false).unwrap();

        assert_eq!(grid.visible_to_column(0), Some(0));
        assert_eq!(grid.visible_to_column(1), Some(2));
        assert_eq!(grid.visible_to_column(2), Some(3));
        assert_eq!(grid.visible_to_column(3), None);

        assert_eq!(grid.column_to_visible(0), Some(0));
        assert_eq!(grid.column_to_visible(1), None);
        assert_eq!(grid.column_to_visible(2), Some(1));
        assert_eq!(grid.column_to_visible(3), Some(2));
    }

    #[test]
    fn set_cell_raw_leaves_caches_stale_until_invalidate() {
        use crate::cache::Representation;

        let mut grid = positional_grid(1);
        grid.add_row(row(&["before"]));
        grid.draw();
        assert_eq!(
            grid.cell_value(0, 0, Representation::Display),
            Some(Value::from("before"))
        );

        grid.set_cell_raw(0, 0, Value::from("after")).unwrap();
        // Display cache still reflects data as of the last draw.
        assert_eq!(
            grid.cell_value(0, 0, Representation::Display),
            Some(Value::from("before"))
        );

        grid.invalidate(0, None, InvalidateSource::Data);
        assert_eq!(
            grid.cell_value(0, 0, Representation::Display),
            Some(Value::from("after"))
        );
    }
}
