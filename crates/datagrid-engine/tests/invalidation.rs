//! Cache lifecycle across the public surface: lazy derivation, precise
//! invalidation, the documented stale-after-raw-write behavior, and
//! external-row re-reads through a structural index.

use datagrid_engine::{
    ColumnSpec, Grid, InvalidateSource, NodeRef, Representation, RowData, SearchState,
    SortRequest, StructuralIndex, Value,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_render_grid() -> (Grid, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0).render(Arc::new(move |value| {
        counter.fetch_add(1, Ordering::Relaxed);
        format!("<b>{value}</b>")
    })));
    grid.add_row(RowData::Positional(vec![Value::from("cell")]));
    (grid, calls)
}

#[test]
fn renderer_runs_once_per_cache_lifetime() {
    let (mut grid, calls) = counting_render_grid();

    for _ in 0..5 {
        assert_eq!(
            grid.cell_value(0, 0, Representation::Display),
            Some(Value::from("<b>cell</b>"))
        );
    }
    assert_eq!(calls.load(Ordering::Relaxed), 1);

    grid.invalidate(0, None, InvalidateSource::Data);
    grid.cell_value(0, 0, Representation::Display);
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn set_row_data_invalidates_but_raw_cell_write_does_not() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    grid.add_row(RowData::Positional(vec![Value::from("v1")]));
    grid.draw();
    assert_eq!(
        grid.cell_value(0, 0, Representation::Display),
        Some(Value::from("v1"))
    );

    // Raw write: caches keep showing the pre-write value.
    grid.set_cell_raw(0, 0, Value::from("v2")).unwrap();
    assert_eq!(
        grid.cell_value(0, 0, Representation::Display),
        Some(Value::from("v1"))
    );
    assert_eq!(
        grid.cell_value(0, 0, Representation::Raw),
        Some(Value::from("v2"))
    );

    // Whole-row replacement invalidates.
    grid.set_row_data(0, RowData::Positional(vec![Value::from("v3")]))
        .unwrap();
    assert_eq!(
        grid.cell_value(0, 0, Representation::Display),
        Some(Value::from("v3"))
    );
}

#[test]
fn stale_sort_and_search_keys_until_invalidated() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    grid.add_row(RowData::Positional(vec![Value::from("apple")]));
    grid.add_row(RowData::Positional(vec![Value::from("banana")]));
    grid.set_sort(vec![SortRequest::asc(0)]);
    grid.set_search(SearchState::text("apple"));
    grid.draw();
    assert_eq!(grid.display_order(), &[0]);

    grid.set_cell_raw(0, 0, Value::from("zucchini")).unwrap();
    grid.draw();
    // Still filtered and sorted on the cached "apple" keys.
    assert_eq!(grid.display_order(), &[0]);

    grid.invalidate(0, None, InvalidateSource::Data);
    grid.draw();
    assert_eq!(grid.display_order(), &[] as &[usize]);
}

struct MirrorSource {
    row0: RowData,
}

impl StructuralIndex for MirrorSource {
    fn row_of(&self, _node: NodeRef) -> Option<usize> {
        None
    }
    fn column_of(&self, _node: NodeRef) -> Option<usize> {
        None
    }
    fn cell_of(&self, _node: NodeRef) -> Option<(usize, usize)> {
        None
    }
    fn read_row(&self, row: usize) -> Option<RowData> {
        (row == 0).then(|| self.row0.clone())
    }
}

#[test]
fn external_rows_reread_through_the_structural_index() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    grid.add_row_external(RowData::Positional(vec![Value::from("stale")]));
    grid.set_structural_index(Box::new(MirrorSource {
        row0: RowData::Positional(vec![Value::from("fresh")]),
    }));

    // Auto resolves to a re-read for externally sourced rows.
    grid.invalidate(0, None, InvalidateSource::Auto);
    assert_eq!(
        grid.cell_value(0, 0, Representation::Raw),
        Some(Value::from("fresh"))
    );
}

#[test]
fn data_sourced_rows_keep_their_data_on_auto_invalidate() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    grid.add_row(RowData::Positional(vec![Value::from("mine")]));
    grid.set_structural_index(Box::new(MirrorSource {
        row0: RowData::Positional(vec![Value::from("theirs")]),
    }));

    grid.invalidate(0, None, InvalidateSource::Auto);
    assert_eq!(
        grid.cell_value(0, 0, Representation::Raw),
        Some(Value::from("mine"))
    );

    // Explicit External forces the re-read regardless of provenance.
    grid.invalidate(0, None, InvalidateSource::External);
    assert_eq!(
        grid.cell_value(0, 0, Representation::Raw),
        Some(Value::from("theirs"))
    );
}

#[test]
fn declaring_a_type_refreshes_cached_sort_keys() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    for v in ["9", "10", "2"] {
        grid.add_row(RowData::Positional(vec![Value::from(v)]));
    }
    grid.set_sort(vec![SortRequest::asc(0)]);
    grid.draw();
    // Detected as num: 2, 9, 10.
    assert_eq!(grid.master_order(), &[2, 0, 1]);

    // The declared type replaces the numeric keys; lexical: "10", "2", "9".
    grid.set_column_type(0, "string").unwrap();
    grid.draw();
    assert_eq!(grid.master_order(), &[1, 2, 0]);
}

#[test]
fn column_scoped_invalidation_clears_only_that_columns_type() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    grid.add_column(ColumnSpec::positional(1));
    grid.add_row(RowData::Positional(vec![
        Value::from("7"),
        Value::from("text"),
    ]));
    assert_eq!(grid.column_type(0).unwrap(), "num");
    assert_eq!(grid.column_type(1).unwrap(), "string");

    grid.set_cell_raw(0, 0, Value::from("no longer numeric")).unwrap();
    grid.invalidate(0, Some(0), InvalidateSource::Data);
    assert_eq!(grid.column_type(0).unwrap(), "string");
}

#[test]
fn adding_a_row_resets_detected_types() {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0));
    grid.add_row(RowData::Positional(vec![Value::from("10")]));
    assert_eq!(grid.column_type(0).unwrap(), "num");

    grid.add_row(RowData::Positional(vec![Value::from("ten")]));
    assert_eq!(grid.column_type(0).unwrap(), "string");
}
