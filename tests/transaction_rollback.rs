//! Tests for transaction atomicity.
//!
//! A transaction that is dropped, or whose `execute()` fails, must leave the grid
//! exactly as it was: rows, view state and selection alike.

use fibogrid::{
    Grid, GridError, GridOptions,
    model::{FilterEntry, SortDirection},
    rows,
};
use serde_json::{Value, json};

fn grid() -> Grid {
    Grid::with_rows(
        GridOptions::default(),
        rows![
            { "id": "1", "name": "Ada", "children": "none" },
            { "id": "2", "name": "Grace" },
        ],
    )
    .unwrap()
}

/// Everything a caller can observe about a grid.
fn observe(grid: &Grid) -> Value {
    json!({
        "rows": grid.row_data(),
        "filter": grid.filter_model(),
        "quickFilter": grid.quick_filter(),
        "sort": grid.sort_model(),
        "pagination": grid.pagination(),
        "selection": grid.selection(),
        "edits": grid.edits(),
    })
}

#[test]
fn dropped_manager_discards_everything() {
    let grid = grid();
    let before = observe(&grid);

    {
        let mut tx = grid.manager();
        tx.add(rows![{ "id": "3" }])
            .unwrap()
            .update(rows![{ "id": "1", "name": "Lovelace" }])
            .unwrap()
            .remove(["2"])
            .unwrap();
        // Drop without execute()
    }

    assert_eq!(observe(&grid), before);
}

#[test]
fn dropped_params_discards_everything() {
    let grid = grid();
    let before = observe(&grid);

    {
        let mut tx = grid.params();
        tx.set_filter(FilterEntry::text("name", "a"))
            .unwrap()
            .set_sort("name", SortDirection::Desc)
            .unwrap()
            .select_all()
            .unwrap()
            .grid_manager(|tx| {
                tx.remove(["1"])?;
                Ok(())
            })
            .unwrap();
    }

    assert_eq!(observe(&grid), before);
}

#[test]
fn conflict_rolls_back_view_state_too() {
    let grid = grid();
    let before = observe(&grid);

    let err = grid
        .params()
        .set_quick_filter("grace")
        .unwrap()
        .set_page_size(1)
        .unwrap()
        .select_row("1")
        .unwrap()
        .edit_cell("2", "name", "G")
        .unwrap()
        .grid_manager(|tx| {
            tx.update_cell("1", "name", "Countess")?
                .add(rows![{ "id": "2" }])?;
            Ok(())
        })
        .unwrap()
        .execute()
        .unwrap_err();

    assert!(matches!(err, GridError::Conflict { .. }));
    assert_eq!(observe(&grid), before);
}

#[test]
fn missing_split_target_rolls_back() {
    let grid = grid();
    let before = observe(&grid);

    let err = grid
        .manager()
        .upsert(rows![{ "id": "9" }])
        .unwrap()
        .split("404", false)
        .unwrap()
        .execute()
        .unwrap_err();

    assert!(matches!(err, GridError::NotFound { op: "split", ref id } if id == "404"));
    assert_eq!(observe(&grid), before);
}

#[test]
fn split_into_non_array_children_rolls_back() {
    let grid = grid();
    let before = observe(&grid);

    let err = grid
        .manager()
        .remove(["2"])
        .unwrap()
        .split("1", true)
        .unwrap()
        .execute()
        .unwrap_err();

    assert!(matches!(err, GridError::Validation { op: "split", .. }));
    assert_eq!(observe(&grid), before);
}

#[test]
fn key_change_can_invalidate_queued_rows() {
    let grid = grid();
    let before = observe(&grid);

    // valid when queued, but the key set afterwards applies to it as well
    let mut tx = grid.manager();
    tx.add(rows![{ "id": "3" }]).unwrap();
    tx.key("sku").unwrap();
    let err = tx.execute().unwrap_err();

    assert!(matches!(err, GridError::Validation { op: "add", .. }));
    assert_eq!(observe(&grid), before);
}

#[test]
fn grid_recovers_after_failure() {
    let grid = grid();

    let _ = grid
        .manager()
        .add(rows![{ "id": "1" }])
        .unwrap()
        .execute()
        .unwrap_err();

    grid.manager()
        .add(rows![{ "id": "3" }])
        .unwrap()
        .execute()
        .unwrap();
    assert_eq!(grid.row_ids(), ["1", "2", "3"]);
}
