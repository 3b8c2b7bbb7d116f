//! Deferred, batched grid transactions.
//!
//! A transaction is a builder that records operations into a [`PendingOps`] queue
//! without touching the grid. Nothing is visible until `execute()`, which hands the
//! queue to the executor and commits the result in one step:
//!
//! - **Method chaining** - every builder method returns `Result<&mut Self, _>`
//! - **Atomic commit** - either every queued operation applies or none does
//! - **Automatic rollback** - a builder dropped without `execute()` changes nothing
//! - **Deterministic order** - operations apply in a fixed order, not call order
//!
//! # Example
//!
//! ```
//! use fibogrid::{Grid, GridOptions, rows};
//!
//! let grid = Grid::with_rows(GridOptions::default(), rows![{ "id": "1", "n": 1 }])?;
//!
//! let mut tx = grid.manager();
//! tx.upsert(rows![{ "id": "1", "n": 2 }, { "id": "2", "n": 3 }])?;
//!
//! // Nothing has happened yet.
//! assert_eq!(grid.len(), 1);
//!
//! let changes = tx.execute()?;
//! assert_eq!(changes.updated, ["1"]);
//! assert_eq!(changes.added, ["2"]);
//! # Ok::<(), fibogrid::GridError>(())
//! ```
//!
//! # Execution Order
//!
//! Queued operations apply in this order regardless of how they were called:
//!
//! 1. state reset
//! 2. cell edit resets, then queued cell edits
//! 3. filter transforms, in call order
//! 4. quick filter
//! 5. sort transforms, in call order
//! 6. page size and page
//! 7. selection
//! 8. selection metadata
//! 9. row data: replace-all, upserts, updates, splits, removes, adds
//! 10. page clamp against the resulting row count
//!
//! Within step 9, upserts are classified into updates and adds against the rows
//! present at that point, so a row removed in the same transaction counts as
//! absent.
//!
//! ## How Execution Works
//!
//! - **On execute**: the grid's lock is taken and the committed state is read
//! - **During the pipeline**: a new state value is built from the queue
//! - **On success**: the new state replaces the old one and [`Changes`] are returned
//! - **On error**: the new state is dropped and the grid stays as it was
//!
//! Since executions are serialized by the lock, concurrent transactions behave as
//! if they ran one after the other.
//!
//! # Nesting
//!
//! [`ParamsBuilder::grid_manager`] runs a closure against a nested
//! [`ManagerBuilder`] that shares the parent's configuration. Its operations join the
//! parent queue when the closure returns `Ok`, and the whole batch executes with the
//! parent. Calling `execute()` on the nested builder fails with
//! [`StateError::NestedExecute`](crate::StateError::NestedExecute).
//!
//! # Builder Lifecycle
//!
//! After `execute()` a builder is spent, whether or not execution succeeded. Every
//! further call fails with [`StateError::Spent`](crate::StateError::Spent).

mod builder;
mod changes;
pub(crate) mod executor;
mod manager;
mod params;
mod queue;

pub use changes::{Changes, ReplaceDiff};
pub use manager::ManagerBuilder;
pub use params::ParamsBuilder;
pub use queue::{
    FilterTransform, PendingOps, PendingUpdate, ReplaceAll, SelectionInstruction,
    SelectionTarget, SortTransform, SplitOp,
};
