use crate::{
    IdSet, Row, RowId,
    model::{CellRef, FilterEntry, FilterModel, SelectionMode, SortEntry, SortModel},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;

type FilterFn = Box<dyn FnOnce(FilterModel) -> FilterModel + Send>;
type SortFn = Box<dyn FnOnce(SortModel) -> SortModel + Send>;

/// A queued change to the filter model.
///
/// Transforms receive the whole model, so a queue of them can replace, merge into or
/// prune the model and the result depends only on the order they were queued in.
pub enum FilterTransform {
    Replace(FilterModel),
    Set(FilterEntry),
    Remove(String),
    Clear,
    Custom(FilterFn),
}

impl FilterTransform {
    pub fn apply(self, mut model: FilterModel) -> FilterModel {
        match self {
            Self::Replace(next) => return FilterModel::from_entries(next.iter().cloned()),
            Self::Set(entry) => model.set(entry),
            Self::Remove(field) => {
                model.remove(&field);
            }
            Self::Clear => model.clear(),
            Self::Custom(f) => return f(model),
        }
        model
    }

    fn describe(&self) -> Value {
        match self {
            Self::Replace(model) => json!({ "op": "replace", "model": model }),
            Self::Set(entry) => json!({ "op": "set", "entry": entry }),
            Self::Remove(field) => json!({ "op": "remove", "field": field }),
            Self::Clear => json!({ "op": "clear" }),
            Self::Custom(_) => json!({ "op": "custom" }),
        }
    }
}

impl fmt::Debug for FilterTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(model) => f.debug_tuple("Replace").field(model).finish(),
            Self::Set(entry) => f.debug_tuple("Set").field(entry).finish(),
            Self::Remove(field) => f.debug_tuple("Remove").field(field).finish(),
            Self::Clear => f.write_str("Clear"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A queued change to the sort model. Same contract as [`FilterTransform`].
pub enum SortTransform {
    Replace(SortModel),
    Set(SortEntry),
    Remove(String),
    Clear,
    Custom(SortFn),
}

impl SortTransform {
    pub fn apply(self, mut model: SortModel) -> SortModel {
        match self {
            Self::Replace(next) => return SortModel::from_entries(next.iter().cloned()),
            Self::Set(entry) => model.set(entry),
            Self::Remove(field) => {
                model.remove(&field);
            }
            Self::Clear => model.clear(),
            Self::Custom(f) => return f(model),
        }
        model
    }

    fn describe(&self) -> Value {
        match self {
            Self::Replace(model) => json!({ "op": "replace", "model": model }),
            Self::Set(entry) => json!({ "op": "set", "entry": entry }),
            Self::Remove(field) => json!({ "op": "remove", "field": field }),
            Self::Clear => json!({ "op": "clear" }),
            Self::Custom(_) => json!({ "op": "custom" }),
        }
    }
}

impl fmt::Debug for SortTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(model) => f.debug_tuple("Replace").field(model).finish(),
            Self::Set(entry) => f.debug_tuple("Set").field(entry).finish(),
            Self::Remove(field) => f.debug_tuple("Remove").field(field).finish(),
            Self::Clear => f.write_str("Clear"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Which rows a selection instruction addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionTarget {
    Ids(Vec<RowId>),
    /// Every row the transaction commits.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionInstruction {
    pub target: SelectionTarget,
    pub selected: bool,
    /// Falls back to the grid's current selection mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SelectionMode>,
}

/// A partial row update waiting for execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PendingUpdate {
    /// Partial row, addressed by its own identifier.
    Row { row: Row },
    /// Single field of an explicitly addressed row.
    Cell {
        row_id: RowId,
        field: String,
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOp {
    pub row_id: RowId,
    pub as_child: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAll {
    pub rows: Vec<Row>,
    /// Field to diff old and new rows by, for the entered/exited hints in
    /// [`Changes`](super::Changes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_key: Option<String>,
    /// Total row count reported by a row source.
    #[serde(skip)]
    pub(crate) total_rows: Option<usize>,
}

/// The Pending-Operation Queue of one transaction.
///
/// Every slot is independent. Sequences keep enqueue order, scalar slots keep the
/// last write. Nothing in here has touched the grid yet; identifiers of queued rows
/// are resolved only when the queue executes, under whatever [`key`](Self::key)
/// override is in effect by then.
#[derive(Debug, Default)]
pub struct PendingOps {
    pub(crate) filter_transforms: Vec<FilterTransform>,
    /// `Some("")` clears the quick filter.
    pub(crate) quick_filter: Option<String>,
    pub(crate) sort_transforms: Vec<SortTransform>,
    pub(crate) page: Option<usize>,
    pub(crate) page_size: Option<usize>,
    pub(crate) selection: Option<SelectionInstruction>,
    pub(crate) selection_data: Option<Value>,
    pub(crate) reset: bool,
    pub(crate) reset_edits: bool,
    pub(crate) reset_cells: Vec<CellRef>,
    pub(crate) reset_rows: IdSet,
    pub(crate) edits: Vec<(CellRef, Value)>,
    pub(crate) replace_all: Option<ReplaceAll>,
    pub(crate) upserts: Vec<Row>,
    pub(crate) updates: Vec<PendingUpdate>,
    pub(crate) removes: IdSet,
    pub(crate) adds: Vec<Row>,
    pub(crate) splits: Vec<SplitOp>,
    pub(crate) key: Option<String>,
    pub(crate) merge_unique: bool,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if executing this queue would be a no-op.
    pub fn is_empty(&self) -> bool {
        self.filter_transforms.is_empty()
            && self.quick_filter.is_none()
            && self.sort_transforms.is_empty()
            && self.page.is_none()
            && self.page_size.is_none()
            && self.selection.is_none()
            && self.selection_data.is_none()
            && !self.reset
            && !self.reset_edits
            && self.reset_cells.is_empty()
            && self.reset_rows.is_empty()
            && self.edits.is_empty()
            && self.replace_all.is_none()
            && self.upserts.is_empty()
            && self.updates.is_empty()
            && self.removes.is_empty()
            && self.adds.is_empty()
            && self.splits.is_empty()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn merge_unique(&self) -> bool {
        self.merge_unique
    }

    /// Moves everything queued in `other` behind what is queued here.
    ///
    /// Scalar slots set in `other` win; `key` and `merge_unique` are taken from
    /// `other`, which starts out as a copy of this queue's configuration.
    pub(crate) fn absorb(&mut self, other: PendingOps) {
        let PendingOps {
            filter_transforms,
            quick_filter,
            sort_transforms,
            page,
            page_size,
            selection,
            selection_data,
            reset,
            reset_edits,
            reset_cells,
            reset_rows,
            edits,
            replace_all,
            upserts,
            updates,
            removes,
            adds,
            splits,
            key,
            merge_unique,
        } = other;

        self.filter_transforms.extend(filter_transforms);
        self.quick_filter = quick_filter.or(self.quick_filter.take());
        self.sort_transforms.extend(sort_transforms);
        self.page = page.or(self.page);
        self.page_size = page_size.or(self.page_size);
        self.selection = selection.or(self.selection.take());
        self.selection_data = selection_data.or(self.selection_data.take());
        self.reset |= reset;
        self.reset_edits |= reset_edits;
        self.reset_cells.extend(reset_cells);
        self.reset_rows.extend(reset_rows);
        self.edits.extend(edits);
        self.replace_all = replace_all.or(self.replace_all.take());
        self.upserts.extend(upserts);
        self.updates.extend(updates);
        self.removes.extend(removes);
        self.adds.extend(adds);
        self.splits.extend(splits);
        self.key = key;
        self.merge_unique = merge_unique;
    }

    /// A queue with this queue's configuration and no operations.
    pub(crate) fn fork(&self) -> PendingOps {
        PendingOps {
            key: self.key.clone(),
            merge_unique: self.merge_unique,
            ..PendingOps::default()
        }
    }

    /// Renders the queue for logging and debugging tools.
    ///
    /// Keys are the slot names; closure transforms show up as `{"op": "custom"}`.
    pub fn snapshot(&self) -> Value {
        let mut slots = Map::new();
        let mut put = |slot: &str, value: Value| {
            slots.insert(slot.to_string(), value);
        };
        put(
            "filterTransforms",
            self.filter_transforms.iter().map(FilterTransform::describe).collect(),
        );
        put("quickFilter", json!(self.quick_filter));
        put(
            "sortTransforms",
            self.sort_transforms.iter().map(SortTransform::describe).collect(),
        );
        put("page", json!(self.page));
        put("pageSize", json!(self.page_size));
        put("selection", json!(self.selection));
        put("selectionData", json!(self.selection_data));
        put("reset", json!(self.reset));
        put("resetEdits", json!(self.reset_edits));
        put("resetCells", json!(self.reset_cells));
        put("resetRows", json!(self.reset_rows));
        put(
            "edits",
            self.edits
                .iter()
                .map(|(cell, value)| json!({ "cell": cell, "value": value }))
                .collect(),
        );
        put("replaceAll", json!(self.replace_all));
        put("upserts", json!(self.upserts));
        put("updates", json!(self.updates));
        put("removes", json!(self.removes));
        put("adds", json!(self.adds));
        put("splits", json!(self.splits));
        put("key", json!(self.key));
        put("mergeUnique", json!(self.merge_unique));
        Value::Object(slots)
    }
}
