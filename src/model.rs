// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! View-state models: filters, sorting, pagination, selection and cell edits.
//!
//! These are plain values. The executor is the only code that replaces the copies a
//! [`Grid`](crate::Grid) holds; callers receive clones through the read surface.
use crate::{IdMap, IdSet, Row, RowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::ops::Range;

/// The kind of comparison a [`FilterEntry`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Text,
    Number,
    Set,
    Boolean,
    Date,
}

/// One column filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEntry {
    pub field: String,
    pub filter_type: FilterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub value: Value,
}

impl FilterEntry {
    pub fn new(field: impl Into<String>, filter_type: FilterType, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            filter_type,
            operator: None,
            value: value.into(),
        }
    }

    pub fn text(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterType::Text, value)
    }

    pub fn number(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterType::Number, value)
    }

    pub fn set(field: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(field, FilterType::Set, Value::Array(values.into_iter().collect()))
    }

    #[must_use]
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

/// Ordered column filters, at most one per field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterModel(Vec<FilterEntry>);

impl FilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model from `entries`; a later entry for a field replaces an earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = FilterEntry>) -> Self {
        let mut model = Self::new();
        for entry in entries {
            model.set(entry);
        }
        model
    }

    /// Inserts `entry`, replacing the entry for the same field in place.
    pub fn set(&mut self, entry: FilterEntry) {
        match self.0.iter_mut().find(|e| e.field == entry.field) {
            Some(existing) => *existing = entry,
            None => self.0.push(entry),
        }
    }

    /// Removes the entry for `field`, returning whether there was one.
    pub fn remove(&mut self, field: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|e| e.field != field);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, field: &str) -> Option<&FilterEntry> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a FilterModel {
    type Item = &'a FilterEntry;
    type IntoIter = std::slice::Iter<'a, FilterEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub field: String,
    pub direction: SortDirection,
}

impl SortEntry {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Sort keys in precedence order: the first entry is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortModel(SmallVec<[SortEntry; 4]>);

impl SortModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = SortEntry>) -> Self {
        let mut model = Self::new();
        for entry in entries {
            model.set(entry);
        }
        model
    }

    /// Sets the direction for `entry.field`, keeping its precedence if it is already
    /// sorted on and appending it as the lowest-precedence key otherwise.
    pub fn set(&mut self, entry: SortEntry) {
        match self.0.iter_mut().find(|e| e.field == entry.field) {
            Some(existing) => existing.direction = entry.direction,
            None => self.0.push(entry),
        }
    }

    pub fn remove(&mut self, field: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|e| e.field != field);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, field: &str) -> Option<&SortEntry> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SortEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a SortModel {
    type Item = &'a SortEntry;
    type IntoIter = std::slice::Iter<'a, SortEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Zero-based page index and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 0,
            page_size,
        }
    }

    /// Number of pages needed for `rows` rows. An empty grid still has one page.
    pub fn page_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size).max(1)
    }

    pub fn last_page(&self, rows: usize) -> usize {
        self.page_count(rows) - 1
    }

    /// Moves the current page onto the last page if it lies beyond it.
    pub fn clamp(&mut self, rows: usize) {
        self.current_page = self.current_page.min(self.last_page(rows));
    }

    /// Index range of the current page within `rows` rows.
    pub fn range(&self, rows: usize) -> Range<usize> {
        let start = self.current_page.saturating_mul(self.page_size).min(rows);
        let end = start.saturating_add(self.page_size).min(rows);
        start..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Single,
    #[default]
    Multiple,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selected_ids: IdSet,
    pub mode: SelectionMode,
    /// Opaque payload attached through `set_selection_data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl SelectionState {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_ids.contains(id)
    }
}

/// Addresses one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub row_id: RowId,
    pub field: String,
}

impl CellRef {
    pub fn new(row_id: impl Into<RowId>, field: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            field: field.into(),
        }
    }
}

/// Uncommitted cell edits layered over row data when rows are displayed.
///
/// Edits never change the row store. They are dropped by the edit resets, and
/// together with their row when that row leaves the store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditOverrides(IdMap<Map<String, Value>>);

impl EditOverrides {
    pub fn set(&mut self, cell: CellRef, value: Value) {
        self.0.entry(cell.row_id).or_default().insert(cell.field, value);
    }

    pub fn get(&self, cell: &CellRef) -> Option<&Value> {
        self.0.get(&cell.row_id)?.get(&cell.field)
    }

    pub fn row(&self, id: &str) -> Option<&Map<String, Value>> {
        self.0.get(id)
    }

    pub fn clear_cell(&mut self, cell: &CellRef) {
        if let Some(fields) = self.0.get_mut(&cell.row_id) {
            fields.remove(&cell.field);
            if fields.is_empty() {
                self.0.shift_remove(&cell.row_id);
            }
        }
    }

    pub fn clear_row(&mut self, id: &str) {
        self.0.shift_remove(id);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn retain_rows(&mut self, mut keep: impl FnMut(&RowId) -> bool) {
        self.0.retain(|id, _| keep(id));
    }

    /// Number of edited cells.
    pub fn len(&self) -> usize {
        self.0.values().map(Map::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `row` with this grid's edits for `id` written over its fields.
    pub fn apply(&self, id: &str, row: &Row) -> Row {
        let mut row = row.clone();
        if let Some(fields) = self.0.get(id) {
            for (field, value) in fields {
                row.insert(field.clone(), value.clone());
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_set_replaces_per_field() {
        let mut model = FilterModel::new();
        model.set(FilterEntry::text("name", "a"));
        model.set(FilterEntry::number("age", 3));
        model.set(FilterEntry::text("name", "b"));

        assert_eq!(model.len(), 2);
        assert_eq!(model.iter().next().unwrap().value, json!("b"));
        assert!(model.remove("name"));
        assert!(!model.remove("name"));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn filter_entry_wire_shape() {
        let entry = FilterEntry::text("name", "ad").with_operator("startsWith");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"field": "name", "filterType": "text", "operator": "startsWith", "value": "ad"})
        );
    }

    #[test]
    fn sort_set_keeps_precedence() {
        let mut model = SortModel::from_entries([
            SortEntry::new("a", SortDirection::Asc),
            SortEntry::new("b", SortDirection::Asc),
        ]);
        model.set(SortEntry::new("a", SortDirection::Desc));
        let fields: Vec<_> = model.iter().map(|e| (e.field.as_str(), e.direction)).collect();
        assert_eq!(fields, [("a", SortDirection::Desc), ("b", SortDirection::Asc)]);
    }

    #[test]
    fn pagination_bounds() {
        let mut pages = Pagination::new(10);
        assert_eq!(pages.page_count(0), 1);
        assert_eq!(pages.page_count(10), 1);
        assert_eq!(pages.page_count(11), 2);

        pages.current_page = 5;
        pages.clamp(25);
        assert_eq!(pages.current_page, 2);
        assert_eq!(pages.range(25), 20..25);

        pages.clamp(0);
        assert_eq!(pages.range(0), 0..0);
    }

    #[test]
    fn edits_layer_and_clear() {
        let mut edits = EditOverrides::default();
        edits.set(CellRef::new("1", "name"), json!("edited"));
        edits.set(CellRef::new("1", "age"), json!(9));
        assert_eq!(edits.len(), 2);

        let row = Row::from_value(json!({"id": "1", "name": "orig", "x": true})).unwrap();
        assert_eq!(
            Value::from(edits.apply("1", &row)),
            json!({"id": "1", "name": "edited", "x": true, "age": 9})
        );

        edits.clear_cell(&CellRef::new("1", "name"));
        assert_eq!(edits.len(), 1);
        edits.clear_cell(&CellRef::new("1", "age"));
        assert!(edits.is_empty());
    }

    #[quickcheck]
    fn qc_clamped_page_is_in_range(page: usize, size: u8, rows: u16) {
        let mut pages = Pagination {
            current_page: page,
            page_size: usize::from(size) + 1,
        };
        let rows = usize::from(rows);
        pages.clamp(rows);
        assert!(pages.current_page < pages.page_count(rows));
        let range = pages.range(rows);
        assert!(range.end <= rows);
        assert!(range.len() <= pages.page_size);
        if rows > 0 {
            assert!(!range.is_empty());
        }
    }
}
