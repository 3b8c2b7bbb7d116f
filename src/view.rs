// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Read-side evaluation of the view state.
//!
//! Turns the committed row store into the rows a grid shows: edits are layered over
//! the row data, then column filters, the quick filter, sorting and finally the page
//! window are applied. Nothing here can fail. A filter that cannot be evaluated
//! (unknown operator, mistyped value) simply matches no rows.
use crate::{
    Row, RowStore,
    model::{EditOverrides, FilterEntry, FilterModel, FilterType, Pagination, SortDirection, SortModel},
};
use serde_json::Value;
use std::cmp::Ordering;

/// The parts of the view state that decide which rows are visible.
#[derive(Debug, Clone, Copy)]
pub struct ViewQuery<'a> {
    pub filter: &'a FilterModel,
    pub quick_filter: Option<&'a str>,
    pub quick_filter_case_sensitive: bool,
    pub sort: &'a SortModel,
}

/// Rows passing all filters, with edits applied, in sort order.
pub fn visible_rows(rows: &RowStore, edits: &EditOverrides, query: ViewQuery<'_>) -> Vec<Row> {
    let mut visible: Vec<Row> = rows
        .iter()
        .map(|(id, row)| edits.apply(id.as_str(), row))
        .filter(|row| matches_query(row, &query))
        .collect();
    sort_rows(&mut visible, query.sort);
    visible
}

/// The page of [`visible_rows`] selected by `pages`.
pub fn displayed_rows(
    rows: &RowStore,
    edits: &EditOverrides,
    query: ViewQuery<'_>,
    pages: &Pagination,
) -> Vec<Row> {
    let mut visible = visible_rows(rows, edits, query);
    let range = pages.range(visible.len());
    visible.truncate(range.end);
    visible.drain(..range.start);
    visible
}

/// Number of rows passing all filters.
pub fn filtered_count(rows: &RowStore, edits: &EditOverrides, query: ViewQuery<'_>) -> usize {
    rows.iter()
        .filter(|(id, row)| match edits.row(id.as_str()) {
            Some(_) => matches_query(&edits.apply(id.as_str(), row), &query),
            None => matches_query(row, &query),
        })
        .count()
}

fn matches_query(row: &Row, query: &ViewQuery<'_>) -> bool {
    query.filter.iter().all(|entry| matches_filter(row, entry))
        && query.quick_filter.is_none_or(|text| {
            matches_quick_filter(row, text, query.quick_filter_case_sensitive)
        })
}

/// Evaluates one column filter against `row`.
pub fn matches_filter(row: &Row, entry: &FilterEntry) -> bool {
    let cell = row.get(&entry.field).unwrap_or(&Value::Null);
    let operator = entry.operator.as_deref();
    match entry.filter_type {
        FilterType::Text => matches_text(cell, operator.unwrap_or("contains"), &entry.value),
        FilterType::Number => matches_number(cell, operator.unwrap_or("equals"), &entry.value),
        FilterType::Date => matches_date(cell, operator.unwrap_or("equals"), &entry.value),
        FilterType::Set => match &entry.value {
            Value::Array(members) => members.iter().any(|m| loosely_equal(m, cell)),
            _ => false,
        },
        FilterType::Boolean => entry.value.as_bool().is_some_and(|b| cell.as_bool() == Some(b)),
    }
}

fn is_blank(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_text(cell: &Value, operator: &str, needle: &Value) -> bool {
    match operator {
        "blank" => return is_blank(cell),
        "notBlank" => return !is_blank(cell),
        _ => {}
    }
    let Some(needle) = text_of(needle).map(|s| s.to_lowercase()) else {
        return false;
    };
    let haystack = text_of(cell).unwrap_or_default().to_lowercase();
    match operator {
        "contains" => haystack.contains(&needle),
        "notContains" => !haystack.contains(&needle),
        "equals" => haystack == needle,
        "notEqual" => haystack != needle,
        "startsWith" => haystack.starts_with(&needle),
        "endsWith" => haystack.ends_with(&needle),
        _ => false,
    }
}

fn matches_number(cell: &Value, operator: &str, target: &Value) -> bool {
    match operator {
        "blank" => return cell.is_null(),
        "notBlank" => return !cell.is_null(),
        _ => {}
    }
    let Some(x) = cell.as_f64() else {
        return false;
    };
    if operator == "inRange" {
        return match target.as_array().map(Vec::as_slice) {
            Some([from, to]) => match (from.as_f64(), to.as_f64()) {
                (Some(from), Some(to)) => from <= x && x <= to,
                _ => false,
            },
            _ => false,
        };
    }
    let Some(y) = target.as_f64() else {
        return false;
    };
    match operator {
        "equals" => x == y,
        "notEqual" => x != y,
        "lessThan" => x < y,
        "lessThanOrEqual" => x <= y,
        "greaterThan" => x > y,
        "greaterThanOrEqual" => x >= y,
        _ => false,
    }
}

// Dates are compared as RFC 3339 strings, whose lexical order is chronological for
// a fixed offset.
fn matches_date(cell: &Value, operator: &str, target: &Value) -> bool {
    match operator {
        "blank" => return is_blank(cell),
        "notBlank" => return !is_blank(cell),
        _ => {}
    }
    let Some(x) = cell.as_str() else {
        return false;
    };
    if operator == "inRange" {
        return match target.as_array().map(Vec::as_slice) {
            Some([Value::String(from), Value::String(to)]) => {
                from.as_str() <= x && x <= to.as_str()
            }
            _ => false,
        };
    }
    let Some(y) = target.as_str() else {
        return false;
    };
    match operator {
        "equals" => x == y,
        "notEqual" => x != y,
        "lessThan" | "before" => x < y,
        "greaterThan" | "after" => x > y,
        _ => false,
    }
}

fn loosely_equal(member: &Value, cell: &Value) -> bool {
    match (member, cell) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => member == cell,
    }
}

/// True when any scalar field of `row` contains `text`.
///
/// An empty `text` matches every row.
pub fn matches_quick_filter(row: &Row, text: &str, case_sensitive: bool) -> bool {
    if text.is_empty() {
        return true;
    }
    if case_sensitive {
        row.values().filter_map(text_of).any(|v| v.contains(text))
    } else {
        let text = text.to_lowercase();
        row.values()
            .filter_map(text_of)
            .any(|v| v.to_lowercase().contains(&text))
    }
}

/// Stable multi-key sort.
pub fn sort_rows(rows: &mut [Row], sort: &SortModel) {
    if sort.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, sort));
}

pub fn compare_rows(a: &Row, b: &Row, sort: &SortModel) -> Ordering {
    for entry in sort {
        let ordering = compare_values(
            a.get(&entry.field).unwrap_or(&Value::Null),
            b.get(&entry.field).unwrap_or(&Value::Null),
        );
        let ordering = match entry.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Orders null before booleans, numbers, strings, arrays and objects; values of the
/// same type compare naturally, containers compare equal.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        IdMap,
        model::SortEntry,
        row,
    };
    use serde_json::json;

    fn store(rows: Vec<Row>) -> RowStore {
        rows.into_iter()
            .map(|r| (crate::RowId::from_value(&r["id"]).unwrap(), r))
            .collect::<IdMap<Row>>()
    }

    fn people() -> RowStore {
        store(vec![
            row! { "id": "1", "name": "Ada", "age": 36, "active": true },
            row! { "id": "2", "name": "Grace", "age": 45, "active": false },
            row! { "id": "3", "name": "Alan", "age": null, "active": true },
            row! { "id": "4", "name": "Edsger", "age": 72, "active": true },
        ])
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    fn query<'a>(filter: &'a FilterModel, sort: &'a SortModel) -> ViewQuery<'a> {
        ViewQuery {
            filter,
            quick_filter: None,
            quick_filter_case_sensitive: false,
            sort,
        }
    }

    #[test]
    fn text_filters() {
        let row = row! { "name": "Grace Hopper" };
        let check = |op: &str, value: Value| {
            matches_filter(&row, &FilterEntry::text("name", value).with_operator(op))
        };
        assert!(check("contains", json!("hop")));
        assert!(check("startsWith", json!("grace")));
        assert!(check("endsWith", json!("PER")));
        assert!(check("notContains", json!("ada")));
        assert!(!check("equals", json!("grace")));
        assert!(check("notBlank", json!(null)));
        assert!(!check("unknown", json!("g")));
    }

    #[test]
    fn number_filters() {
        let row = row! { "age": 40 };
        let check = |op: &str, value: Value| {
            matches_filter(&row, &FilterEntry::number("age", value).with_operator(op))
        };
        assert!(check("equals", json!(40)));
        assert!(check("greaterThan", json!(39.5)));
        assert!(check("lessThanOrEqual", json!(40)));
        assert!(check("inRange", json!([30, 40])));
        assert!(!check("inRange", json!([41, 50])));
        assert!(!check("equals", json!("40")));
        assert!(!matches_filter(&row! { "age": null }, &FilterEntry::number("age", 1)));
    }

    #[test]
    fn set_and_boolean_filters() {
        let row = row! { "kind": "b", "n": 2, "flag": false };
        assert!(matches_filter(&row, &FilterEntry::set("kind", [json!("a"), json!("b")])));
        assert!(matches_filter(&row, &FilterEntry::set("n", [json!(2.0)])));
        assert!(!matches_filter(&row, &FilterEntry::set("kind", [json!("c")])));
        assert!(matches_filter(
            &row,
            &FilterEntry::new("flag", FilterType::Boolean, false)
        ));
    }

    #[test]
    fn date_filters() {
        let row = row! { "at": "2024-03-01T00:00:00Z" };
        let entry = |op: &str, value: Value| {
            FilterEntry::new("at", FilterType::Date, value).with_operator(op)
        };
        assert!(matches_filter(&row, &entry("after", json!("2024-01-01T00:00:00Z"))));
        assert!(matches_filter(
            &row,
            &entry("inRange", json!(["2024-01-01T00:00:00Z", "2024-12-31T00:00:00Z"]))
        ));
        assert!(!matches_filter(&row, &entry("before", json!("2024-01-01T00:00:00Z"))));
    }

    #[test]
    fn quick_filter_any_field() {
        let row = row! { "id": "7", "name": "Ada", "meta": { "city": "London" } };
        assert!(matches_quick_filter(&row, "ad", false));
        assert!(!matches_quick_filter(&row, "ad", true));
        assert!(matches_quick_filter(&row, "7", false));
        // nested objects are not searched
        assert!(!matches_quick_filter(&row, "london", false));
        assert!(matches_quick_filter(&row, "", true));
    }

    #[test]
    fn sort_with_nulls_first_and_secondary_key() {
        let rows = people();
        let sort = SortModel::from_entries([
            SortEntry::new("active", SortDirection::Desc),
            SortEntry::new("age", SortDirection::Asc),
        ]);
        let filter = FilterModel::new();
        let visible = visible_rows(&rows, &EditOverrides::default(), query(&filter, &sort));
        assert_eq!(ids(&visible), ["3", "1", "4", "2"]);
    }

    #[test]
    fn page_window_after_filter() {
        let rows = people();
        let filter = FilterModel::from_entries([FilterEntry::new("active", FilterType::Boolean, true)]);
        let sort = SortModel::new();
        let mut pages = Pagination::new(2);
        pages.current_page = 1;

        let q = query(&filter, &sort);
        assert_eq!(filtered_count(&rows, &EditOverrides::default(), q), 3);
        let shown = displayed_rows(&rows, &EditOverrides::default(), q, &pages);
        assert_eq!(ids(&shown), ["4"]);
    }

    #[test]
    fn edits_are_filtered_on() {
        let rows = people();
        let mut edits = EditOverrides::default();
        edits.set(crate::model::CellRef::new("2", "name"), json!("Adelaide"));
        let filter = FilterModel::from_entries([FilterEntry::text("name", "ad")]);
        let sort = SortModel::new();

        let visible = visible_rows(&rows, &edits, query(&filter, &sort));
        assert_eq!(ids(&visible), ["1", "2"]);
        assert_eq!(filtered_count(&rows, &edits, query(&filter, &sort)), 2);
    }
}
