use super::{
    Changes, PendingOps,
    builder::{BuilderCore, non_blank},
    queue::{PendingUpdate, ReplaceAll, SplitOp},
};
use crate::{Grid, GridError, Row, RowId};
use serde_json::Value;

/// Queues row mutations for one transaction.
///
/// Obtained from [`Grid::manager`]. Every method only appends to the builder's
/// [`PendingOps`]; the grid changes when [`execute`](Self::execute) runs, and a
/// builder dropped before that changes nothing.
///
/// Methods return the builder for chaining, or a [`GridError::Validation`] if the
/// input is malformed, in which case nothing from that call is queued.
///
/// # Example
///
/// ```
/// use fibogrid::{Grid, GridOptions, row, rows};
///
/// let grid = Grid::with_rows(GridOptions::default(), rows![{ "id": "1", "qty": 1 }])?;
/// let changes = grid
///     .manager()
///     .update_cell("1", "qty", 5)?
///     .add(rows![{ "id": "2", "qty": 0 }])?
///     .execute()?;
///
/// assert_eq!(changes.added, ["2"]);
/// assert_eq!(grid.row("1"), Some(row! { "id": "1", "qty": 5 }));
/// # Ok::<(), fibogrid::GridError>(())
/// ```
#[derive(Debug)]
pub struct ManagerBuilder<'g> {
    core: BuilderCore<'g>,
}

impl<'g> ManagerBuilder<'g> {
    pub(crate) fn new(grid: &'g Grid) -> Self {
        Self {
            core: BuilderCore::new(grid),
        }
    }

    pub(crate) fn nested(grid: &'g Grid, ops: PendingOps) -> Self {
        Self {
            core: BuilderCore::nested(grid, ops),
        }
    }

    pub(crate) fn into_ops(self) -> PendingOps {
        self.core.into_ops()
    }

    /// The operations queued so far.
    pub fn pending(&self) -> &PendingOps {
        &self.core.ops
    }

    /// Appends rows at the end of the store.
    ///
    /// An identifier that already exists makes `execute()` fail with
    /// [`GridError::Conflict`], unless [`merge_unique`](Self::merge_unique) is on.
    pub fn add(&mut self, rows: impl IntoIterator<Item = Row>) -> Result<&mut Self, GridError> {
        let rows = self.core.identified_rows("add", rows)?;
        self.core.ops.adds.extend(rows);
        Ok(self)
    }

    /// Updates rows that exist and adds the others.
    ///
    /// Which is which is decided by `execute()` against the rows committed at that
    /// point, not now.
    pub fn upsert(&mut self, rows: impl IntoIterator<Item = Row>) -> Result<&mut Self, GridError> {
        let rows = self.core.identified_rows("upsert", rows)?;
        self.core.ops.upserts.extend(rows);
        Ok(self)
    }

    /// Deep-merges partial rows into the rows with the same identifier.
    ///
    /// Rows that do not exist at execution are skipped and reported in
    /// [`Changes::ignored_updates`].
    pub fn update(&mut self, rows: impl IntoIterator<Item = Row>) -> Result<&mut Self, GridError> {
        let rows = self.core.identified_rows("update", rows)?;
        self.core
            .ops
            .updates
            .extend(rows.into_iter().map(|row| PendingUpdate::Row { row }));
        Ok(self)
    }

    /// Removes rows by identifier; unknown identifiers are skipped.
    pub fn remove(
        &mut self,
        ids: impl IntoIterator<Item = impl Into<RowId>>,
    ) -> Result<&mut Self, GridError> {
        let ids = self.core.ids("remove", ids)?;
        self.core.ops.removes.extend(ids);
        Ok(self)
    }

    /// Sets a single field of a row.
    ///
    /// Merges with other updates of the same row in this transaction; the last
    /// write to a field wins.
    pub fn update_cell(
        &mut self,
        row_id: impl Into<RowId>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let row_id = RowId::new(non_blank("update_cell", "row id", row_id.into().into_string())?);
        let field = non_blank("update_cell", "field", field.into())?;
        self.core.ops.updates.push(PendingUpdate::Cell {
            row_id,
            field,
            value: value.into(),
        });
        Ok(self)
    }

    /// Clones a row under the identifier `"{row_id}-split-{timestamp}"`.
    ///
    /// With `as_child` the clone is appended to the original's children field
    /// (`"children"` unless configured otherwise), otherwise it is inserted right
    /// after the original. The clone never carries the original's children.
    /// `execute()` fails with [`GridError::NotFound`] if the row does not exist.
    ///
    /// The new identifier is written to the grid's key field, so grids that identify
    /// rows through [`GridOptions::with_key_fn`](crate::GridOptions::with_key_fn)
    /// reject splits with [`GridError::Validation`].
    pub fn split(
        &mut self,
        row_id: impl Into<RowId>,
        as_child: bool,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        if self.core.grid.options().key_fn.is_some() {
            return Err(GridError::validation(
                "split",
                "rows identified by an accessor have no field to write the new id to",
            ));
        }
        let row_id = RowId::new(non_blank("split", "row id", row_id.into().into_string())?);
        self.core.ops.splits.push(SplitOp { row_id, as_child });
        Ok(self)
    }

    /// Replaces every row. Updates, removes and adds queued in the same
    /// transaction apply on top of the new rows.
    pub fn replace_all(
        &mut self,
        rows: impl IntoIterator<Item = Row>,
    ) -> Result<&mut Self, GridError> {
        self.queue_replace_all(rows, None, None)
    }

    /// Like [`replace_all`](Self::replace_all), and additionally reports which
    /// values of `compare_key` entered, left or stayed in [`Changes::replaced`].
    pub fn replace_all_by(
        &mut self,
        rows: impl IntoIterator<Item = Row>,
        compare_key: impl Into<String>,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let compare_key = non_blank("replace_all", "compare key", compare_key.into())?;
        self.queue_replace_all(rows, Some(compare_key), None)
    }

    pub(crate) fn queue_replace_all(
        &mut self,
        rows: impl IntoIterator<Item = Row>,
        compare_key: Option<String>,
        total_rows: Option<usize>,
    ) -> Result<&mut Self, GridError> {
        self.core.open()?;
        let rows: Vec<Row> = rows.into_iter().collect();
        let key = self.core.key_selector();
        for row in &rows {
            key.require("replace_all", row)?;
        }
        self.core.ops.replace_all = Some(ReplaceAll {
            rows,
            compare_key,
            total_rows,
        });
        Ok(self)
    }

    /// Matches rows of this transaction by `field` instead of the grid's key.
    ///
    /// Applies to everything queued on this builder, including rows queued before
    /// the call, and ends with `execute()`.
    pub fn key(&mut self, field: impl Into<String>) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.key = Some(non_blank("key", "key field", field.into())?);
        Ok(self)
    }

    /// Turns adds of existing identifiers into deep-merge updates.
    pub fn merge_unique(&mut self, enable: bool) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.merge_unique = enable;
        Ok(self)
    }

    /// Attaches an opaque payload to the selection without changing it.
    pub fn set_selection_data(&mut self, payload: impl Into<Value>) -> Result<&mut Self, GridError> {
        self.core.open()?;
        self.core.ops.selection_data = Some(payload.into());
        Ok(self)
    }

    /// Applies every queued operation at once.
    ///
    /// On error the grid is left exactly as it was. Either way the builder is spent
    /// afterwards and further calls fail with
    /// [`StateError::Spent`](crate::StateError::Spent).
    pub fn execute(&mut self) -> Result<Changes, GridError> {
        self.core.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridOptions, StateError, rows};

    fn grid() -> Grid {
        Grid::with_rows(GridOptions::default(), rows![{ "id": "1" }]).unwrap()
    }

    #[test]
    fn empty_input_is_rejected_before_queueing() {
        let grid = grid();
        let mut tx = grid.manager();
        assert!(matches!(
            tx.add(Vec::new()),
            Err(GridError::Validation { op: "add", .. })
        ));
        assert!(matches!(
            tx.remove(Vec::<RowId>::new()),
            Err(GridError::Validation { op: "remove", .. })
        ));
        assert!(tx.pending().is_empty());
    }

    #[test]
    fn malformed_batch_queues_nothing() {
        let grid = grid();
        let mut tx = grid.manager();
        let err = tx.add(rows![{ "id": "2" }, { "name": "no id" }]).unwrap_err();
        assert!(matches!(err, GridError::Validation { op: "add", .. }));
        assert!(tx.pending().adds.is_empty());
    }

    #[test]
    fn update_cell_requires_row_and_field() {
        let grid = grid();
        let mut tx = grid.manager();
        assert!(tx.update_cell("", "a", 1).is_err());
        assert!(tx.update_cell("1", "", 1).is_err());
        assert!(tx.update_cell("1", "a", 1).is_ok());
        assert_eq!(tx.pending().updates.len(), 1);
    }

    #[test]
    fn key_override_changes_validation() {
        let grid = grid();
        let mut tx = grid.manager();
        tx.key("sku").unwrap();
        assert!(tx.add(rows![{ "id": "2" }]).is_err());
        assert!(tx.upsert(rows![{ "sku": "B" }]).is_ok());
        assert_eq!(tx.pending().key(), Some("sku"));
    }

    #[test]
    fn spent_builder_refuses_calls() {
        let grid = grid();
        let mut tx = grid.manager();
        tx.add(rows![{ "id": "2" }]).unwrap();
        let _ = tx.execute().unwrap();

        assert!(matches!(
            tx.add(rows![{ "id": "3" }]),
            Err(GridError::State(StateError::Spent))
        ));
        assert!(matches!(tx.execute(), Err(GridError::State(StateError::Spent))));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn spent_even_when_execution_fails() {
        let grid = grid();
        let mut tx = grid.manager();
        tx.split("missing", false).unwrap();
        assert!(matches!(tx.execute(), Err(GridError::NotFound { .. })));
        assert!(matches!(tx.merge_unique(true), Err(GridError::State(StateError::Spent))));
    }

    #[test]
    fn dropped_builder_changes_nothing() {
        let grid = grid();
        {
            let mut tx = grid.manager();
            tx.add(rows![{ "id": "2" }]).unwrap().remove(["1"]).unwrap();
        }
        assert_eq!(grid.row_ids(), ["1"]);
    }
}
