use super::{
    Changes, ManagerBuilder, PendingOps,
    builder::{BuilderCore, non_blank},
    queue::{FilterTransform, SelectionInstruction, SelectionTarget, SortTransform},
};
use crate::{
    Grid, GridError, RowId,
    model::{CellRef, FilterEntry, FilterModel, SelectionMode, SortDirection, SortEntry, SortModel},
};
use serde_json::Value;

/// Queues view-state changes for one transaction.
///
/// Obtained from [`Grid::params`]. Filter and sort changes queue as transforms and
/// compose in call order; quick filter, page, page size and selection are single
/// slots where the last call wins. Row mutations can join the same transaction
/// through [`grid_manager`](Self::grid_manager).
///
/// # Example
///
/// ```
/// use fibogrid::{Grid, GridOptions, model::{FilterEntry, SortDirection}, rows};
///
/// let grid = Grid::with_rows(
///     GridOptions::default(),
///     rows![{ "id": "1", "city": "Oslo" }, { "id": "2", "city": "Bergen" }],
/// )?;
///
/// grid.params()
///     .set_filter(FilterEntry::text("city", "o"))?
///     .set_sort("city", SortDirection::Asc)?
///     .select_row("2")?
///     .execute()?;
///
/// assert_eq!(grid.filtered_row_count(), 1);
/// assert_eq!(grid.selected_ids().len(), 1);
/// # Ok::<(), fibogrid::GridError>(())
/// ```
#[derive(Debug)]
pub struct ParamsBuilder<'g> {
    core: BuilderCore<'g>,
}

impl<'g> ParamsBuilder<'g> {
    pub(crate) fn new(grid: &'g Grid) -> Self {
        Self {
            core: BuilderCore::new(grid),
        }
    }

    /// The operations queued so far.
    pub fn pending(&self) -> &PendingOps {
        &self.core.ops
    }

    fn filter(&mut self, transform: FilterTransform) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.filter_transforms.push(transform);
        Ok(self)
    }

    fn sort(&mut self, transform: SortTransform) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.sort_transforms.push(transform);
        Ok(self)
    }

    fn selection(&mut self, instruction: SelectionInstruction) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.selection = Some(instruction);
        Ok(self)
    }

    /// Replaces the filter model.
    pub fn set_filter_model(&mut self, model: FilterModel) -> Result<&mut Self, GridError> {
        self.filter(FilterTransform::Replace(model))
    }

    /// Sets the entry for one field, keeping the others.
    pub fn set_filter(&mut self, entry: FilterEntry) -> Result<&mut Self, GridError> {
        self.core.open()?;
        if entry.field.is_empty() {
            return Err(GridError::validation("set_filter", "field must not be empty"));
        }
        self.filter(FilterTransform::Set(entry))
    }

    /// Queues an arbitrary rewrite of the filter model.
    ///
    /// The closure sees the model as left by the transforms queued before it.
    pub fn update_filter_model<F>(&mut self, f: F) -> Result<&mut Self, GridError>
    where
        F: FnOnce(FilterModel) -> FilterModel + Send + 'static,
    {
        self.filter(FilterTransform::Custom(Box::new(f)))
    }

    pub fn remove_filter(&mut self, field: impl Into<String>) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let field = non_blank("remove_filter", "field", field.into())?;
        self.filter(FilterTransform::Remove(field))
    }

    pub fn remove_all_filter(&mut self) -> Result<&mut Self, GridError> {
        self.filter(FilterTransform::Clear)
    }

    pub fn set_quick_filter(&mut self, text: impl Into<String>) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.quick_filter = Some(text.into());
        Ok(self)
    }

    /// Clears the quick filter, overriding earlier `set_quick_filter` calls.
    pub fn remove_quick_filter(&mut self) -> Result<&mut Self, GridError> {
        self.set_quick_filter(String::new())
    }

    /// Replaces the sort model; entry order is precedence.
    pub fn set_sort_model(&mut self, model: SortModel) -> Result<&mut Self, GridError> {
        self.sort(SortTransform::Replace(model))
    }

    /// Sorts by `field`, keeping its precedence if it is already sorted on and
    /// appending it otherwise.
    pub fn set_sort(
        &mut self,
        field: impl Into<String>,
        direction: SortDirection,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let field = non_blank("set_sort", "field", field.into())?;
        self.sort(SortTransform::Set(SortEntry::new(field, direction)))
    }

    pub fn update_sort_model<F>(&mut self, f: F) -> Result<&mut Self, GridError>
    where
        F: FnOnce(SortModel) -> SortModel + Send + 'static,
    {
        self.sort(SortTransform::Custom(Box::new(f)))
    }

    pub fn remove_sort(&mut self, field: impl Into<String>) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let field = non_blank("remove_sort", "field", field.into())?;
        self.sort(SortTransform::Remove(field))
    }

    pub fn remove_all_sort(&mut self) -> Result<&mut Self, GridError> {
        self.sort(SortTransform::Clear)
    }

    /// Moves to a zero-based page. Out-of-range pages are clamped at execution.
    pub fn set_page(&mut self, page: usize) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.page = Some(page);
        Ok(self)
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<&mut Self, GridError> {
        self.core.open()?;
        if size == 0 {
            return Err(GridError::validation("set_page_size", "page size must be positive"));
        }
        self.core.ops.page_size = Some(size);
        Ok(self)
    }

    pub fn select_row(&mut self, id: impl Into<RowId>) -> Result<&mut Self, GridError> {
        self.select_rows([id], true)
    }

    /// Selects or deselects rows in the grid's current selection mode.
    ///
    /// Only the last selection call of a transaction takes effect.
    pub fn select_rows(
        &mut self,
        ids: impl IntoIterator<Item = impl Into<RowId>>,
        selected: bool,
    ) -> Result<&mut Self, GridError> {
        let ids = self.core.ids("select_rows", ids)?;
        self.selection(SelectionInstruction {
            target: SelectionTarget::Ids(ids),
            selected,
            mode: None,
        })
    }

    pub fn deselect_rows(
        &mut self,
        ids: impl IntoIterator<Item = impl Into<RowId>>,
    ) -> Result<&mut Self, GridError> {
        self.select_rows(ids, false)
    }

    /// Like [`select_rows`](Self::select_rows), switching the selection mode first.
    ///
    /// In [`SelectionMode::Single`] at most the last of `ids` stays selected.
    pub fn select_rows_with_mode(
        &mut self,
        ids: impl IntoIterator<Item = impl Into<RowId>>,
        selected: bool,
        mode: SelectionMode,
    ) -> Result<&mut Self, GridError> {
        let ids = self.core.ids("select_rows", ids)?;
        self.selection(SelectionInstruction {
            target: SelectionTarget::Ids(ids),
            selected,
            mode: Some(mode),
        })
    }

    /// Selects every row the transaction commits, including rows it adds.
    pub fn select_all(&mut self) -> Result<&mut Self, GridError> {
        self.selection(SelectionInstruction {
            target: SelectionTarget::All,
            selected: true,
            mode: None,
        })
    }

    pub fn deselect_all(&mut self) -> Result<&mut Self, GridError> {
        self.selection(SelectionInstruction {
            target: SelectionTarget::All,
            selected: false,
            mode: None,
        })
    }

    pub fn set_selection_data(&mut self, payload: impl Into<Value>) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.selection_data = Some(payload.into());
        Ok(self)
    }

    /// Wipes filters, quick filter, sort, page, selection and cell edits before
    /// anything else in the transaction applies.
    ///
    /// Unless the transaction also replaces all rows, the row store is emptied too
    /// and row mutations queued alongside apply to an empty store.
    pub fn reset_state(&mut self) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.reset = true;
        Ok(self)
    }

    /// Drops every cell edit override.
    pub fn reset_edits(&mut self) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.reset_edits = true;
        Ok(self)
    }

    pub fn reset_cells(
        &mut self,
        cells: impl IntoIterator<Item = CellRef>,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.reset_cells.extend(cells);
        Ok(self)
    }

    pub fn reset_rows(
        &mut self,
        ids: impl IntoIterator<Item = impl Into<RowId>>,
    ) -> Result<&mut Self, GridError> {
        let ids = self.core.ids("reset_rows", ids)?;
        self.core.ops.reset_rows.extend(ids);
        Ok(self)
    }

    /// Records an edit override for one cell.
    ///
    /// Overrides are layered over the stored row when it is displayed; the row
    /// itself is unchanged. Use [`ManagerBuilder::update_cell`] to write through.
    pub fn edit_cell(
        &mut self,
        row_id: impl Into<RowId>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let row_id = non_blank("edit_cell", "row id", row_id.into().into_string())?;
        let field = non_blank("edit_cell", "field", field.into())?;
        self.core
            .ops
            .edits
            .push((CellRef::new(row_id, field), value.into()));
        Ok(self)
    }

    /// Embeds row mutations in this transaction.
    ///
    /// `f` fills a [`ManagerBuilder`] whose operations are merged into this queue
    /// when it returns `Ok`. If it returns an error, none of its operations are kept
    /// and the error is passed on. The nested builder cannot execute on its own.
    ///
    /// ```
    /// use fibogrid::{Grid, GridOptions, rows};
    ///
    /// let grid = Grid::new(GridOptions::default())?;
    /// grid.params()
    ///     .grid_manager(|tx| {
    ///         tx.add(rows![{ "id": "1" }, { "id": "2" }])?;
    ///         Ok(())
    ///     })?
    ///     .select_all()?
    ///     .execute()?;
    ///
    /// assert_eq!(grid.selected_ids().len(), 2);
    /// # Ok::<(), fibogrid::GridError>(())
    /// ```
    pub fn grid_manager<F>(&mut self, f: F) -> Result<&mut Self, GridError>
    where
        F: FnOnce(&mut ManagerBuilder<'g>) -> Result<(), GridError>,
    {
        self.core.open()?;
        let mut nested = ManagerBuilder::nested(self.core.grid, self.core.ops.fork());
        f(&mut nested)?;
        self.core.ops.absorb(nested.into_ops());
        Ok(self)
    }

    /// Applies every queued operation at once.
    ///
    /// On error the grid is left exactly as it was. Either way the builder is spent
    /// afterwards.
    pub fn execute(&mut self) -> Result<Changes, GridError> {
        self.core.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridOptions, StateError, rows};

    fn grid() -> Grid {
        Grid::with_rows(
            GridOptions::default(),
            rows![{ "id": "1", "n": 3 }, { "id": "2", "n": 1 }, { "id": "3", "n": 2 }],
        )
        .unwrap()
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let grid = grid();
        let mut tx = grid.params();
        assert!(matches!(
            tx.set_page_size(0),
            Err(GridError::Validation { op: "set_page_size", .. })
        ));
        assert!(tx.pending().is_empty());
    }

    #[test]
    fn quick_filter_last_write_wins() {
        let grid = grid();
        let _ = grid
            .params()
            .set_quick_filter("a")
            .unwrap()
            .set_quick_filter("b")
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(grid.quick_filter().as_deref(), Some("b"));

        let _ = grid
            .params()
            .set_quick_filter("c")
            .unwrap()
            .remove_quick_filter()
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(grid.quick_filter(), None);
    }

    #[test]
    fn sort_transforms_compose_in_order() {
        let grid = grid();
        let _ = grid
            .params()
            .set_sort("n", SortDirection::Asc)
            .unwrap()
            .update_sort_model(|mut model: SortModel| {
                model.set(SortEntry::new("n", SortDirection::Desc));
                model
            })
            .unwrap()
            .execute()
            .unwrap();

        let ids: Vec<_> = grid
            .displayed_rows()
            .iter()
            .map(|row| row["id"].clone())
            .collect();
        assert_eq!(ids, ["1", "3", "2"]);
    }

    #[test]
    fn failed_nested_manager_queues_nothing() {
        let grid = grid();
        let mut tx = grid.params();
        let err = tx
            .grid_manager(|tx| {
                tx.add(rows![{ "id": "9" }])?;
                tx.update(rows![{ "missing": "key" }])?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, GridError::Validation { op: "update", .. }));
        assert!(tx.pending().is_empty());
    }

    #[test]
    fn nested_manager_cannot_execute() {
        let grid = grid();
        let mut tx = grid.params();
        let err = tx
            .grid_manager(|tx| {
                tx.remove(["1"])?;
                tx.execute().map(|_| ())
            })
            .unwrap_err();
        assert!(matches!(err, GridError::State(StateError::NestedExecute)));
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn edits_layer_over_rows() {
        let grid = grid();
        let _ = grid.params().edit_cell("2", "n", 10).unwrap().execute().unwrap();

        assert_eq!(grid.row("2").unwrap()["n"], 1);
        assert_eq!(grid.edits().len(), 1);
        let shown = grid.displayed_rows();
        assert_eq!(shown[1]["n"], 10);

        let _ = grid.params().reset_rows(["2"]).unwrap().execute().unwrap();
        assert!(grid.edits().is_empty());
    }
}
