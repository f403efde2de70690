//! Property coverage for the sort pass: permutation, stability, and exact
//! asc/desc reversal including tied rows.

use datagrid_engine::{ColumnSpec, Grid, RowData, SortDirection, SortRequest, Value};
use proptest::prelude::*;

fn grid_from(values: &[(u8, u8)]) -> Grid {
    let mut grid = Grid::new();
    grid.add_column(ColumnSpec::positional(0).name("key"));
    grid.add_column(ColumnSpec::positional(1).name("minor"));
    for (key, minor) in values {
        grid.add_row(RowData::Positional(vec![
            Value::from(f64::from(*key)),
            Value::from(f64::from(*minor)),
        ]));
    }
    grid
}

proptest! {
    #[test]
    fn sorted_master_is_a_permutation_of_the_rows(values in prop::collection::vec((0u8..8, 0u8..8), 0..60)) {
        let mut grid = grid_from(&values);
        grid.set_sort(vec![SortRequest::asc(0)]);
        grid.draw();

        let mut sorted = grid.master_order().to_vec();
        sorted.sort_unstable();
        let expected: Vec<usize> = (0..values.len()).collect();
        prop_assert_eq!(sorted, expected);
    }

    #[test]
    fn equal_keys_keep_insertion_order(values in prop::collection::vec((0u8..4, 0u8..4), 0..60)) {
        let mut grid = grid_from(&values);
        grid.set_sort(vec![SortRequest::asc(0)]);
        grid.draw();

        let order = grid.master_order();
        for window in order.windows(2) {
            let (a, b) = (window[0], window[1]);
            if values[a].0 == values[b].0 {
                prop_assert!(a < b, "tied rows {a} and {b} out of insertion order");
            }
        }
    }

    #[test]
    fn descending_is_the_exact_reverse_of_ascending(values in prop::collection::vec((0u8..6, 0u8..6), 0..60)) {
        let mut grid = grid_from(&values);
        grid.set_sort(vec![SortRequest::asc(0)]);
        grid.draw();
        let ascending = grid.master_order().to_vec();

        grid.set_sort(vec![SortRequest::desc(0)]);
        grid.draw();
        let mut reversed = grid.master_order().to_vec();
        reversed.reverse();
        prop_assert_eq!(reversed, ascending.clone());

        // And flipping back round-trips, tied rows included.
        grid.set_sort(vec![SortRequest::asc(0)]);
        grid.draw();
        prop_assert_eq!(grid.master_order().to_vec(), ascending);
    }

    #[test]
    fn multi_key_sort_orders_minor_key_within_major_groups(values in prop::collection::vec((0u8..4, 0u8..16), 0..60)) {
        let mut grid = grid_from(&values);
        grid.set_sort(vec![SortRequest::asc(0), SortRequest::desc(1)]);
        grid.draw();

        for window in grid.master_order().windows(2) {
            let (a, b) = (window[0], window[1]);
            prop_assert!(values[a].0 <= values[b].0);
            if values[a].0 == values[b].0 {
                prop_assert!(values[a].1 >= values[b].1);
            }
        }
    }

    #[test]
    fn preview_matches_a_real_sort_without_mutating(values in prop::collection::vec((0u8..6, 0u8..6), 1..40)) {
        let mut grid = grid_from(&values);
        grid.draw();
        let before = grid.master_order().to_vec();

        let preview = grid.sort_preview(0, SortDirection::Asc).unwrap();
        prop_assert_eq!(grid.master_order(), before.as_slice());

        grid.set_sort(vec![SortRequest::asc(0)]);
        grid.draw();
        prop_assert_eq!(preview, grid.master_order().to_vec());
    }
}
