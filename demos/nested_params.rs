use fibogrid::{
    Grid, GridError, GridOptions,
    model::{FilterEntry, SortDirection},
    rows,
};

fn main() -> Result<(), GridError> {
    let grid = Grid::with_rows(
        GridOptions::default().with_page_size(2),
        rows![
            { "id": "1", "city": "Oslo", "population": 709_000 },
            { "id": "2", "city": "Bergen", "population": 291_000 },
            { "id": "3", "city": "Trondheim", "population": 212_000 },
        ],
    )?;

    // View state and row data change in one transaction
    grid.params()
        .set_filter(FilterEntry::number("population", 250_000).with_operator("greaterThan"))?
        .set_sort("population", SortDirection::Asc)?
        .grid_manager(|tx| {
            tx.add(rows![{ "id": "4", "city": "Stavanger", "population": 149_000 }])?
                .split("1", true)?;
            Ok(())
        })?
        .select_all()?
        .execute()?;

    println!("Filtered rows: {}", grid.filtered_row_count());
    for row in grid.displayed_rows() {
        println!("  {} ({})", row["city"], row["population"]);
    }
    println!("Selected: {:?}", grid.selected_ids());

    let oslo = grid.row("1").unwrap_or_default();
    println!("Oslo children: {}", oslo["children"]);

    // Start over; a reset also clears the rows
    grid.params().reset_state()?.execute()?;
    assert!(grid.is_empty());
    assert!(grid.filter_model().is_empty());

    Ok(())
}
