// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{
    Changes, GridError, GridOptions, IdSet, Row, RowId, RowStore,
    model::{EditOverrides, FilterModel, Pagination, SelectionState, SortModel},
    transaction::{ManagerBuilder, ParamsBuilder, PendingOps, executor},
    view::{self, ViewQuery},
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, debug_span, warn};

/// Everything a transaction can change, committed as one value.
#[derive(Debug, Clone)]
pub(crate) struct GridState {
    pub(crate) rows: RowStore,
    pub(crate) filter: FilterModel,
    pub(crate) quick_filter: Option<String>,
    pub(crate) sort: SortModel,
    pub(crate) pagination: Pagination,
    pub(crate) selection: SelectionState,
    pub(crate) edits: EditOverrides,
    /// Row count reported by a server-side row source.
    pub(crate) total_rows: Option<usize>,
}

impl GridState {
    pub(crate) fn new(options: &GridOptions) -> Self {
        Self {
            rows: RowStore::default(),
            filter: FilterModel::default(),
            quick_filter: None,
            sort: SortModel::default(),
            pagination: Pagination::new(options.page_size),
            selection: SelectionState::new(options.selection_mode),
            edits: EditOverrides::default(),
            total_rows: None,
        }
    }

    /// Clones everything but the rows, which the executor rebuilds anyway.
    pub(crate) fn clone_view(&self) -> Self {
        Self {
            rows: RowStore::default(),
            filter: self.filter.clone(),
            quick_filter: self.quick_filter.clone(),
            sort: self.sort.clone(),
            pagination: self.pagination,
            selection: self.selection.clone(),
            edits: self.edits.clone(),
            total_rows: self.total_rows,
        }
    }

    pub(crate) fn query<'a>(&'a self, options: &GridOptions) -> ViewQuery<'a> {
        ViewQuery {
            filter: &self.filter,
            quick_filter: self.quick_filter.as_deref(),
            quick_filter_case_sensitive: options.quick_filter_case_sensitive,
            sort: &self.sort,
        }
    }
}

/// A row store and its view state.
///
/// The only way to change a grid is to build a transaction with [`Grid::manager`] or
/// [`Grid::params`] and call `execute()` on it. Builders only borrow the grid
/// immutably, so any number of them can be filled concurrently; executions are
/// serialized by an internal lock and each one classifies its operations against
/// the state the previous one committed.
///
/// All read methods return copies of committed state.
///
/// # Example
///
/// ```
/// use fibogrid::{Grid, GridOptions, rows};
///
/// let grid = Grid::with_rows(GridOptions::default(), rows![{ "id": "1" }, { "id": "2" }])?;
/// grid.manager().remove(["1"])?.execute()?;
/// assert_eq!(grid.len(), 1);
/// # Ok::<(), fibogrid::GridError>(())
/// ```
#[derive(Debug)]
pub struct Grid {
    options: GridOptions,
    state: Mutex<GridState>,
}

impl Grid {
    /// Creates an empty grid.
    ///
    /// # Errors
    ///
    /// Fails with [`GridError::Validation`] if `options` are unusable, such as a zero
    /// page size.
    pub fn new(options: GridOptions) -> Result<Self, GridError> {
        options.validate()?;
        let state = GridState::new(&options);
        Ok(Self {
            options,
            state: Mutex::new(state),
        })
    }

    /// Creates a grid holding `rows`.
    ///
    /// # Errors
    ///
    /// Besides invalid options, fails if a row has no identifier or two rows share
    /// one.
    pub fn with_rows(
        options: GridOptions,
        rows: impl IntoIterator<Item = Row>,
    ) -> Result<Self, GridError> {
        let grid = Self::new(options)?;
        let key = grid.options.key_selector();
        {
            let mut state = grid.lock();
            for row in rows {
                let id = key.require("with_rows", &row)?;
                if state.rows.contains_key(&id) {
                    return Err(GridError::Conflict { id });
                }
                state.rows.insert(id, row);
            }
        }
        Ok(grid)
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// Starts a row-mutation transaction.
    pub fn manager(&self) -> ManagerBuilder<'_> {
        ManagerBuilder::new(self)
    }

    /// Starts a view-state transaction.
    pub fn params(&self) -> ParamsBuilder<'_> {
        ParamsBuilder::new(self)
    }

    // A panic cannot leave the state half-written since commits are a single
    // assignment, so a poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, GridState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the executor against the committed state and swaps the result in.
    pub(crate) fn commit(&self, ops: PendingOps) -> Result<Changes, GridError> {
        let tx = next_transaction_id();
        let span = debug_span!("execute", %tx);
        let _enter = span.enter();

        let mut state = self.lock();
        match executor::execute(&state, ops, &self.options) {
            Ok((next, changes)) => {
                *state = next;
                debug!(
                    added = changes.added.len(),
                    updated = changes.updated.len(),
                    removed = changes.removed.len(),
                    rows = state.rows.len(),
                    "committed transaction"
                );
                Ok(changes)
            }
            Err(err) => {
                warn!(error = %err, "transaction aborted");
                Err(err)
            }
        }
    }

    /// All rows in store order.
    pub fn row_data(&self) -> Vec<Row> {
        self.lock().rows.values().cloned().collect()
    }

    pub fn row(&self, id: &str) -> Option<Row> {
        self.lock().rows.get(id).cloned()
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.lock().rows.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().rows.is_empty()
    }

    /// The current page of filtered and sorted rows, with cell edits applied.
    ///
    /// Rows loaded from a [`RowSource`](crate::source::RowSource) already are the
    /// page and are not paged again.
    pub fn displayed_rows(&self) -> Vec<Row> {
        let state = self.lock();
        if state.total_rows.is_some() {
            return view::visible_rows(&state.rows, &state.edits, state.query(&self.options));
        }
        view::displayed_rows(
            &state.rows,
            &state.edits,
            state.query(&self.options),
            &state.pagination,
        )
    }

    /// Number of rows passing the filter model and quick filter.
    pub fn filtered_row_count(&self) -> usize {
        let state = self.lock();
        view::filtered_count(&state.rows, &state.edits, state.query(&self.options))
    }

    /// Selected rows in selection order.
    pub fn selected_rows(&self) -> Vec<Row> {
        let state = self.lock();
        state
            .selection
            .selected_ids
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect()
    }

    pub fn selected_ids(&self) -> IdSet {
        self.lock().selection.selected_ids.clone()
    }

    pub fn selection(&self) -> SelectionState {
        self.lock().selection.clone()
    }

    pub fn filter_model(&self) -> FilterModel {
        self.lock().filter.clone()
    }

    pub fn sort_model(&self) -> SortModel {
        self.lock().sort.clone()
    }

    pub fn quick_filter(&self) -> Option<String> {
        self.lock().quick_filter.clone()
    }

    pub fn pagination(&self) -> Pagination {
        self.lock().pagination
    }

    pub fn edits(&self) -> EditOverrides {
        self.lock().edits.clone()
    }

    /// Total row count reported by the last row source page, if any.
    pub fn total_rows(&self) -> Option<usize> {
        self.lock().total_rows
    }

    /// A snapshot of the view-state slots a row source needs.
    pub(crate) fn view_snapshot(&self) -> (Pagination, SortModel, FilterModel) {
        let state = self.lock();
        (state.pagination, state.sort.clone(), state.filter.clone())
    }
}

#[cfg(feature = "ulid")]
fn next_transaction_id() -> ulid::Ulid {
    ulid::Ulid::new()
}

#[cfg(not(feature = "ulid"))]
fn next_transaction_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
