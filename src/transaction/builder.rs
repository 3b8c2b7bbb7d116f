use super::{Changes, PendingOps};
use crate::{GridError, Grid, KeySelector, Row, RowId, StateError};
use std::mem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    /// Embedded in a parent builder; executes with it.
    Nested,
    Spent,
}

/// State shared by both builder surfaces: the grid, the queue and the lifecycle.
#[derive(Debug)]
pub(crate) struct BuilderCore<'g> {
    pub(crate) grid: &'g Grid,
    pub(crate) ops: PendingOps,
    phase: Phase,
}

impl<'g> BuilderCore<'g> {
    pub(crate) fn new(grid: &'g Grid) -> Self {
        Self {
            grid,
            ops: PendingOps::new(),
            phase: Phase::Open,
        }
    }

    pub(crate) fn nested(grid: &'g Grid, ops: PendingOps) -> Self {
        Self {
            grid,
            ops,
            phase: Phase::Nested,
        }
    }

    /// Fails once the queue has been executed.
    pub(crate) fn open(&self) -> Result<(), GridError> {
        match self.phase {
            Phase::Spent => Err(StateError::Spent.into()),
            Phase::Open | Phase::Nested => Ok(()),
        }
    }

    /// The selector queued rows are validated with right now.
    pub(crate) fn key_selector(&self) -> KeySelector {
        match &self.ops.key {
            Some(field) => KeySelector::Field(field.clone()),
            None => self.grid.options().key_selector(),
        }
    }

    /// Collects `rows`, failing if there are none or one has no identifier.
    pub(crate) fn identified_rows(
        &self,
        op: &'static str,
        rows: impl IntoIterator<Item = Row>,
    ) -> Result<Vec<Row>, GridError> {
        self.open()?;
        let rows = non_empty(op, rows.into_iter().collect())?;
        let key = self.key_selector();
        for row in &rows {
            key.require(op, row)?;
        }
        Ok(rows)
    }

    pub(crate) fn ids(
        &self,
        op: &'static str,
        ids: impl IntoIterator<Item = impl Into<RowId>>,
    ) -> Result<Vec<RowId>, GridError> {
        self.open()?;
        let ids: Vec<RowId> = non_empty(op, ids.into_iter().map(Into::into).collect())?;
        if ids.iter().any(|id| id.as_str().is_empty()) {
            return Err(GridError::validation(op, "row identifier is empty"));
        }
        Ok(ids)
    }

    pub(crate) fn execute(&mut self) -> Result<Changes, GridError> {
        match self.phase {
            Phase::Nested => Err(StateError::NestedExecute.into()),
            Phase::Spent => Err(StateError::Spent.into()),
            Phase::Open => {
                self.phase = Phase::Spent;
                let ops = mem::take(&mut self.ops);
                self.grid.commit(ops)
            }
        }
    }

    pub(crate) fn into_ops(self) -> PendingOps {
        self.ops
    }
}

pub(crate) fn non_empty<T>(op: &'static str, items: Vec<T>) -> Result<Vec<T>, GridError> {
    if items.is_empty() {
        return Err(GridError::validation(op, "expected at least one item"));
    }
    Ok(items)
}

pub(crate) fn non_blank(op: &'static str, what: &str, value: String) -> Result<String, GridError> {
    if value.is_empty() {
        return Err(GridError::validation(op, format!("{what} must not be empty")));
    }
    Ok(value)
}
