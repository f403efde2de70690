use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use datagrid_engine::{
    ColumnSpec, Grid, InvalidateSource, RowData, RowSelector, SearchState, SortRequest, Value,
    ViewOptions,
};

const OFFICES: &[&str] = &["Tokyo", "London", "Edinburgh", "New York", "San Francisco"];

fn build_grid(rows: usize) -> Grid {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0).name("name"));
    grid.add_column(ColumnSpec::positional(1).name("amount"));
    grid.add_column(ColumnSpec::positional(2).name("office"));
    for i in 0..rows {
        grid.add_row(RowData::Positional(vec![
            Value::from(format!("employee {:06}", (i * 7919) % rows.max(1))),
            Value::from(((i * 31) % 9973) as f64),
            Value::from(OFFICES[i % OFFICES.len()]),
        ]));
    }
    grid
}

fn bench_draw_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_cold");
    for &rows in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let mut grid = build_grid(rows);
            grid.set_sort(vec![SortRequest::asc("office"), SortRequest::desc("amount")]);
            grid.set_search(SearchState::text("employee"));
            b.iter(|| {
                // Invalidate everything so each iteration re-derives sort and
                // search keys, the dominant cost of a first draw.
                for row in 0..rows {
                    grid.invalidate(row, None, InvalidateSource::Data);
                }
                grid.draw();
                black_box(grid.display_order().len())
            });
        });
    }
    group.finish();
}

fn bench_draw_warm(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_warm");
    for &rows in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let mut grid = build_grid(rows);
            grid.set_sort(vec![SortRequest::asc("office"), SortRequest::desc("amount")]);
            grid.set_search(SearchState::text("employee"));
            grid.draw();
            b.iter(|| {
                grid.draw();
                black_box(grid.display_order().len())
            });
        });
    }
    group.finish();
}

fn bench_resolve_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_rows");
    for &rows in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            let mut grid = build_grid(rows);
            grid.draw();
            let options = ViewOptions::default();
            b.iter(|| black_box(grid.resolve_rows(&RowSelector::All, &options).len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_draw_cold, bench_draw_warm, bench_resolve_rows);
criterion_main!(benches);
