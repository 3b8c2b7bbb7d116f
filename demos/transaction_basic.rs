use fibogrid::{Grid, GridError, GridOptions, row, rows};

fn main() -> Result<(), GridError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Create a grid with a few rows
    let grid = Grid::with_rows(
        GridOptions::default(),
        rows![
            { "id": "1", "name": "Alice", "age": 30 },
            { "id": "2", "name": "Bob", "active": true },
        ],
    )?;

    // Queue some mutations; nothing is applied until execute()
    let mut tx = grid.manager();
    tx.upsert(rows![{ "id": "2", "age": 41 }, { "id": "3", "name": "Carol" }])?
        .update_cell("1", "age", 31)?
        .remove(["404"])?;
    println!("Queued: {}", serde_json::to_string_pretty(&tx.pending().snapshot()).unwrap());
    println!("Rows before execute: {}", grid.len());

    let changes = tx.execute()?;
    println!("Changes: {}", serde_json::to_string(&changes).unwrap());
    assert_eq!(changes.added, ["3"]);
    assert_eq!(changes.ignored_removes, ["404"]);

    // A failed transaction leaves the grid untouched
    let err = grid
        .manager()
        .add(rows![{ "id": "4" }, { "id": "1" }])?
        .execute()
        .unwrap_err();
    println!("Rejected: {err}");
    assert_eq!(grid.len(), 3);

    for row in grid.row_data() {
        println!("{}", serde_json::Value::from(row));
    }
    assert_eq!(grid.row("1"), Some(row! { "id": "1", "name": "Alice", "age": 31 }));

    println!("\nEvery change went through a single execute()!");
    Ok(())
}
