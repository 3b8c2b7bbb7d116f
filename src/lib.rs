// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # FiboGrid: a deferred-operation transaction executor for grid row stores
//!
//! This crate implements the mutation core behind the FiboGrid data grid: an owned,
//! ordered store of rows together with the view state a grid renders from (filter
//! model, sort model, pagination and selection), and a transaction pipeline that is
//! the only way to change either of them.
//!
//! Nothing in this crate renders anything. It is the engine a UI layer drives through
//! two builder surfaces and reads back through a small set of accessors.
//!
//! ## Core Concepts
//!
//! - [`Grid`]: owns the [`RowStore`] and the view state. It hands out builders and
//!   serializes their execution, so two callers can build transactions concurrently
//!   but their commits are always linearized.
//! - [`Row`]: a JSON object with a mandatory unique identifier. Identifiers are read
//!   from a configurable key field (`"id"` by default) or an accessor closure, see
//!   [`KeySelector`].
//! - [`ManagerBuilder`](transaction::ManagerBuilder): queues row mutations (`add`,
//!   `upsert`, `update`, `remove`, `update_cell`, `split`, `replace_all`).
//! - [`ParamsBuilder`](transaction::ParamsBuilder): queues view-state changes (filters,
//!   quick filter, sorting, pagination, selection, resets, cell edits) and can embed a
//!   manager sub-transaction through
//!   [`grid_manager`](transaction::ParamsBuilder::grid_manager).
//!
//! Builder calls never touch the grid. They append to a
//! [`PendingOps`](transaction::PendingOps) queue, and `execute()` applies the whole
//! queue in one fixed-order pass. Either every queued operation lands or, if any step
//! fails, none of them do.
//!
//! ## Getting Started
//!
//! ```rust
//! use fibogrid::{Grid, GridOptions, row, rows, model::SortDirection};
//!
//! let grid = Grid::with_rows(
//!     GridOptions::default(),
//!     rows![
//!         { "id": "1", "name": "Ada", "age": 36 },
//!         { "id": "2", "name": "Grace", "age": 45 },
//!     ],
//! )?;
//!
//! // Upserts are classified when the transaction executes: "2" exists and is
//! // merged, "3" does not and is appended.
//! let changes = grid
//!     .manager()
//!     .upsert(rows![{ "id": "2", "age": 46 }, { "id": "3", "name": "Edsger" }])?
//!     .execute()?;
//! assert_eq!(changes.updated, ["2"]);
//! assert_eq!(changes.added, ["3"]);
//!
//! grid.params()
//!     .set_sort("name", SortDirection::Desc)?
//!     .set_page_size(2)?
//!     .execute()?;
//!
//! let shown = grid.displayed_rows();
//! assert_eq!(shown.len(), 2);
//! assert_eq!(shown[0], row! { "id": "2", "name": "Grace", "age": 46 });
//! # Ok::<(), fibogrid::GridError>(())
//! ```
//!
//! ## Execution Order
//!
//! The order in which builder methods are chained does not matter. `execute()`
//! always applies the queue in this order:
//!
//! 1. full reset (`reset_state`)
//! 2. edit resets: all edits, then single cells, then whole rows
//! 3. filter transforms, in the order they were queued
//! 4. quick filter (last write wins)
//! 5. sort transforms, in the order they were queued
//! 6. page and page size
//! 7. selection instruction (last write wins)
//! 8. selection metadata
//! 9. row data: replace-all or reset base, then upsert classification, updates,
//!    splits, removes and finally adds
//! 10. commit
//!
//! The page index is clamped once the row data of step 9 is known, so a page
//! request always lands on a page that exists after the transaction.
//!
//! ## Features
//!
//! - `chrono`: derives the numeric suffix of split rows from `chrono::Utc::now()`.
//!   Enabled by default.
//! - `ulid`: tags each executed transaction with a ulid in its tracing span.
//!   Enabled by default.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};

pub mod error;
pub use error::{GridError, StateError};
mod grid;
pub use grid::Grid;
/// Macros usable for tests and initialization
pub mod macros;
pub mod merge;
pub mod model;
mod options;
pub use options::GridOptions;
pub mod row;
pub use row::{KeyFn, KeySelector, Row, RowId};
pub mod source;
/// Transaction builders and the executor behind `execute()`.
///
/// See [`transaction`] module documentation for details and examples.
pub mod transaction;
pub use transaction::Changes;
pub mod view;

/// Ordered set of row identifiers.
pub type IdSet = IndexSet<RowId, RandomState>;

/// Ordered map keyed by row identifier.
pub type IdMap<V> = IndexMap<RowId, V, RandomState>;

/// The authoritative, ordered row collection of a [`Grid`], keyed by row identifier.
///
/// Keys are unique by construction and iteration follows row order.
pub type RowStore = IdMap<Row>;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
