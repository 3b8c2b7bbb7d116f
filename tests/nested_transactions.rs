//! Integration tests for nesting manager transactions in params transactions.

use fibogrid::{
    Grid, GridError, GridOptions, StateError,
    model::{SelectionMode, SortDirection},
    row, rows,
};

fn grid() -> Grid {
    Grid::with_rows(
        GridOptions::default(),
        rows![{ "id": "1", "n": 1 }, { "id": "2", "n": 2 }],
    )
    .unwrap()
}

#[test]
fn nested_rows_and_view_commit_together() {
    let grid = grid();

    let changes = grid
        .params()
        .set_sort("n", SortDirection::Desc)
        .unwrap()
        .grid_manager(|tx| {
            tx.add(rows![{ "id": "3", "n": 3 }])?
                .update_cell("1", "n", 10)?;
            Ok(())
        })
        .unwrap()
        .select_all()
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(changes.added, ["3"]);
    assert_eq!(changes.updated, ["1"]);
    assert_eq!(grid.selected_ids().len(), 3);

    let shown: Vec<_> = grid
        .displayed_rows()
        .into_iter()
        .map(|row| row["n"].clone())
        .collect();
    assert_eq!(shown, [10, 3, 2]);
}

#[test]
fn several_nested_blocks_accumulate() {
    let grid = grid();

    grid.params()
        .grid_manager(|tx| {
            tx.add(rows![{ "id": "3" }])?;
            Ok(())
        })
        .unwrap()
        .set_page_size(1)
        .unwrap()
        .grid_manager(|tx| {
            tx.remove(["1"])?;
            Ok(())
        })
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(grid.row_ids(), ["2", "3"]);
    assert_eq!(grid.pagination().page_size, 1);
}

#[test]
fn nested_key_and_merge_unique_carry_over() {
    let grid = Grid::with_rows(
        GridOptions::default(),
        rows![{ "id": "1", "sku": "A", "qty": 1 }],
    )
    .unwrap();

    grid.params()
        .grid_manager(|tx| {
            tx.key("sku")?.merge_unique(true)?;
            Ok(())
        })
        .unwrap()
        .grid_manager(|tx| {
            assert_eq!(tx.pending().key(), Some("sku"));
            assert!(tx.pending().merge_unique());
            tx.add(rows![{ "sku": "A", "qty": 4 }])?;
            Ok(())
        })
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(grid.row("1"), Some(row! { "id": "1", "sku": "A", "qty": 4 }));
}

#[test]
fn error_in_closure_discards_only_that_block() {
    let grid = grid();

    let mut tx = grid.params();
    tx.grid_manager(|tx| {
        tx.add(rows![{ "id": "3" }])?;
        Ok(())
    })
    .unwrap();

    let err = tx
        .grid_manager(|tx| {
            tx.remove(["1"])?;
            tx.add(Vec::new())?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, GridError::Validation { op: "add", .. }));

    tx.execute().unwrap();
    assert_eq!(grid.row_ids(), ["1", "2", "3"]);
}

#[test]
fn nested_execute_is_refused() {
    let grid = grid();

    let mut tx = grid.params();
    let err = tx
        .grid_manager(|tx| {
            tx.remove(["2"])?;
            tx.execute()?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, GridError::State(StateError::NestedExecute)));
    assert_eq!(grid.len(), 2);

    // the parent is still usable
    tx.select_rows_with_mode(["1", "2"], true, SelectionMode::Single)
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(grid.selected_ids().into_iter().collect::<Vec<_>>(), ["2"]);
}

#[test]
fn nested_selection_data_wins_over_earlier_parent_call() {
    let grid = grid();

    grid.params()
        .set_selection_data("parent")
        .unwrap()
        .grid_manager(|tx| {
            tx.set_selection_data("nested")?;
            Ok(())
        })
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(grid.selection().metadata, Some("nested".into()));
}
