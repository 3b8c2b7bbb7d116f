use crate::RowId;
use serde::Serialize;

/// What an executed transaction did to the row store.
///
/// Identifiers are reported under the key the transaction matched rows by.
/// Operations that addressed rows which did not exist are not errors; they are
/// listed in `ignored_updates` and `ignored_removes` instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    /// Rows appended by adds, upserts and splits, in commit order.
    pub added: Vec<RowId>,
    /// Rows that received at least one merged update.
    pub updated: Vec<RowId>,
    pub removed: Vec<RowId>,
    pub ignored_updates: Vec<RowId>,
    pub ignored_removes: Vec<RowId>,
    /// Set when the transaction replaced the whole row store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<ReplaceDiff>,
}

impl Changes {
    /// True if the row store was left untouched.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.replaced.is_none()
    }
}

/// Identity diff of a replace-all against the rows it replaced.
///
/// Without a compare key only `row_count` is filled in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceDiff {
    pub row_count: usize,
    /// Present in the new rows only.
    pub entered: Vec<RowId>,
    /// Present in the old rows only.
    pub exited: Vec<RowId>,
    /// Present in both.
    pub kept: Vec<RowId>,
}
