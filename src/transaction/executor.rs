//! The fixed-order pipeline behind `execute()`.
//!
//! [`execute`] never touches the live grid. It reads the committed state, builds the
//! complete next state in a scratch copy and hands it back; the caller swaps it in
//! only when every step succeeded.
use super::{
    Changes, PendingOps,
    changes::ReplaceDiff,
    queue::{PendingUpdate, ReplaceAll, SelectionTarget, SplitOp},
};
use crate::{
    GridError, GridOptions, IdMap, IdSet, KeySelector, Row, RowId, RowStore,
    grid::GridState,
    merge::deep_merge,
    model::{SelectionMode, SelectionState},
    view,
};
use indexmap::Equivalent;
use serde_json::{Map, Value};
use std::{hash::Hash, mem};
use tracing::trace;

/// Applies `ops` to `current` and returns the state to commit.
pub(crate) fn execute(
    current: &GridState,
    ops: PendingOps,
    options: &GridOptions,
) -> Result<(GridState, Changes), GridError> {
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
    } = ops;

    let store_key = options.key_selector();
    let match_key = key.map_or_else(|| store_key.clone(), KeySelector::Field);
    let mut next = current.clone_view();

    // 1. full reset
    if reset {
        next.filter.clear();
        next.quick_filter = None;
        next.sort.clear();
        next.pagination.current_page = 0;
        next.selection.selected_ids.clear();
        next.edits.clear();
        next.total_rows = None;
    }

    // 2. narrower edit resets, then the edits queued alongside them
    if reset_edits {
        next.edits.clear();
    }
    for cell in &reset_cells {
        next.edits.clear_cell(cell);
    }
    for id in &reset_rows {
        next.edits.clear_row(id.as_str());
    }
    for (cell, value) in edits {
        next.edits.set(cell, value);
    }

    // 3. filters
    trace!(transforms = filter_transforms.len(), "filter model");
    for transform in filter_transforms {
        next.filter = transform.apply(mem::take(&mut next.filter));
    }

    // 4. quick filter
    if let Some(text) = quick_filter {
        next.quick_filter = (!text.is_empty()).then_some(text);
    }

    // 5. sorting
    trace!(transforms = sort_transforms.len(), "sort model");
    for transform in sort_transforms {
        next.sort = transform.apply(mem::take(&mut next.sort));
    }

    // 6. pagination; the page is clamped once the rows are known
    if let Some(size) = page_size {
        next.pagination.page_size = size;
    }
    if let Some(page) = page {
        next.pagination.current_page = page;
    }

    // 7. selection
    let mut select_all = None;
    if let Some(instruction) = selection {
        next.selection.mode = instruction.mode.unwrap_or(next.selection.mode);
        match instruction.target {
            SelectionTarget::Ids(ids) => select(&mut next.selection, ids, instruction.selected),
            SelectionTarget::All => select_all = Some(instruction.selected),
        }
    }

    // 8. selection metadata
    if let Some(data) = selection_data {
        next.selection.metadata = Some(data);
    }

    // 9. row data
    let mut changes = Changes::default();
    let replaced = replace_all.is_some();
    let base = match replace_all {
        Some(ReplaceAll {
            rows,
            compare_key,
            total_rows,
        }) => {
            changes.replaced = Some(replace_diff(&current.rows, &rows, compare_key));
            next.total_rows = total_rows;
            rows
        }
        None if reset => {
            changes.removed.extend(current.rows.keys().cloned());
            Vec::new()
        }
        None => current.rows.values().cloned().collect(),
    };
    let mut work = WorkingSet::new(base, &match_key);

    // 9a. classification
    let mut patches: IdMap<Map<String, Value>> = IdMap::default();
    for update in updates {
        let (id, patch) = match update {
            PendingUpdate::Row { row } => (match_key.require("update", &row)?, row.into_inner()),
            PendingUpdate::Cell {
                row_id,
                field,
                value,
            } => (row_id, Map::from_iter([(field, value)])),
        };
        merge_into(&mut patches, id, patch);
    }

    // an add of an id that is also being removed re-adds it
    let exists = |work: &WorkingSet, id: &RowId| work.contains(id) && !removes.contains(id);
    let mut appends: IdMap<Row> = IdMap::default();
    for row in adds {
        let id = match_key.require("add", &row)?;
        if merge_unique && exists(&work, &id) {
            merge_into(&mut patches, id, row.into_inner());
        } else if let Some(pending) = appends.get_mut(&id) {
            if !merge_unique {
                return Err(GridError::Conflict { id });
            }
            deep_merge(pending, row.into_inner());
        } else {
            appends.insert(id, row);
        }
    }
    // upserts see the rows as they are before 9c removes anything
    for row in upserts {
        let id = match_key.require("upsert", &row)?;
        if work.contains(&id) {
            merge_into(&mut patches, id, row.into_inner());
        } else if let Some(pending) = appends.get_mut(&id) {
            deep_merge(pending, row.into_inner());
        } else {
            appends.insert(id, row);
        }
    }
    trace!(
        updates = patches.len(),
        adds = appends.len(),
        removes = removes.len(),
        splits = splits.len(),
        "classified row mutations"
    );

    // 9b. updates
    for (id, patch) in patches {
        match work.position(&id) {
            Some(i) => {
                deep_merge(&mut work.rows[i], patch);
                changes.updated.push(id);
            }
            None => changes.ignored_updates.push(id),
        }
    }

    // splits address rows as updated, before anything is removed
    let mut minted = IdSet::default();
    for SplitOp { row_id, as_child } in splits {
        let Some(i) = work.position(&row_id) else {
            return Err(GridError::NotFound {
                op: "split",
                id: row_id,
            });
        };
        let clone_id = mint_split_id(&row_id, |candidate| {
            work.contains(candidate) || appends.contains_key(candidate) || minted.contains(candidate)
        });
        minted.insert(clone_id.clone());

        let mut clone = work.rows[i].clone();
        clone.remove(&options.children_field);
        clone.insert(options.key_field.clone(), clone_id.clone().into());

        if as_child {
            let children = work.rows[i]
                .entry(options.children_field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(children) = children else {
                return Err(GridError::validation(
                    "split",
                    format!(
                        "field `{}` of row `{row_id}` is not an array",
                        options.children_field
                    ),
                ));
            };
            children.push(clone.into());
            if !changes.updated.contains(&row_id) {
                changes.updated.push(row_id);
            }
        } else {
            work.rows.insert(i + 1, clone);
            work.reindex(&match_key);
            changes.added.push(clone_id);
        }
    }

    // 9c. removes
    let mut removed = IdSet::default();
    for id in removes {
        if work.contains(&id) {
            removed.insert(id);
        } else {
            changes.ignored_removes.push(id);
        }
    }
    if !removed.is_empty() {
        work.rows
            .retain(|row| match_key.extract(row).is_none_or(|id| !removed.contains(&id)));
        work.reindex(&match_key);
        changes.removed.extend(removed);
    }

    // 9d. adds
    for (id, row) in appends {
        if work.contains(&id) {
            return Err(GridError::Conflict { id });
        }
        work.push(id.clone(), row);
        changes.added.push(id);
    }

    // a server total no longer describes rows added or removed locally
    if !replaced && (!changes.added.is_empty() || !changes.removed.is_empty()) {
        next.total_rows = None;
    }

    next.rows = work.into_store(&store_key)?;

    if let Some(selected) = select_all {
        select_every_row(&mut next.selection, &next.rows, selected);
    }
    next.selection
        .selected_ids
        .retain(|id| next.rows.contains_key(id));
    next.edits.retain_rows(|id| next.rows.contains_key(id));

    let bound = match next.total_rows {
        Some(total) => total,
        None => view::filtered_count(&next.rows, &next.edits, next.query(options)),
    };
    next.pagination.clamp(bound);

    Ok((next, changes))
}

fn merge_into(patches: &mut IdMap<Map<String, Value>>, id: RowId, patch: Map<String, Value>) {
    match patches.get_mut(&id) {
        Some(existing) => deep_merge(existing, patch),
        None => {
            patches.insert(id, patch);
        }
    }
}

fn select(state: &mut SelectionState, ids: Vec<RowId>, selected: bool) {
    match (state.mode, selected) {
        (_, false) => {
            for id in &ids {
                state.selected_ids.shift_remove(id);
            }
        }
        (SelectionMode::Single, true) => {
            if let Some(last) = ids.into_iter().last() {
                state.selected_ids.clear();
                state.selected_ids.insert(last);
            }
        }
        (SelectionMode::Multiple, true) => state.selected_ids.extend(ids),
    }
    enforce_mode(state);
}

fn select_every_row(state: &mut SelectionState, rows: &RowStore, selected: bool) {
    if selected {
        state.selected_ids.extend(rows.keys().cloned());
    } else {
        state.selected_ids.clear();
    }
    enforce_mode(state);
}

// single mode keeps the most recent selection
fn enforce_mode(state: &mut SelectionState) {
    if state.mode == SelectionMode::Single && state.selected_ids.len() > 1 {
        let keep = state.selected_ids.len() - 1;
        state.selected_ids.drain(..keep);
    }
}

fn replace_diff(old: &RowStore, new: &[Row], compare_key: Option<String>) -> ReplaceDiff {
    let mut diff = ReplaceDiff {
        row_count: new.len(),
        ..ReplaceDiff::default()
    };
    let Some(field) = compare_key else {
        return diff;
    };
    let key = KeySelector::Field(field);
    let before: IdSet = old.values().filter_map(|row| key.extract(row)).collect();
    let after: IdSet = new.iter().filter_map(|row| key.extract(row)).collect();
    for id in &after {
        if before.contains(id) {
            diff.kept.push(id.clone());
        } else {
            diff.entered.push(id.clone());
        }
    }
    diff.exited = before.into_iter().filter(|id| !after.contains(id)).collect();
    diff
}

fn mint_split_id(row_id: &RowId, taken: impl Fn(&str) -> bool) -> RowId {
    let mut stamp = split_stamp();
    loop {
        let candidate = format!("{row_id}-split-{stamp}");
        if !taken(&candidate) {
            return RowId::from(candidate);
        }
        stamp += 1;
    }
}

#[cfg(feature = "chrono")]
fn split_stamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(not(feature = "chrono"))]
fn split_stamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Rows being rewritten by step 9, indexed by the transaction's match key.
///
/// Rows the match key cannot identify stay in place but are unreachable by id.
struct WorkingSet {
    rows: Vec<Row>,
    index: IdMap<usize>,
}

impl WorkingSet {
    fn new(rows: Vec<Row>, key: &KeySelector) -> Self {
        let mut set = Self {
            rows,
            index: IdMap::default(),
        };
        set.reindex(key);
        set
    }

    fn reindex(&mut self, key: &KeySelector) {
        self.index.clear();
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(id) = key.extract(row) {
                self.index.entry(id).or_insert(i);
            }
        }
    }

    fn position<Q>(&self, id: &Q) -> Option<usize>
    where
        Q: ?Sized + Hash + Equivalent<RowId>,
    {
        self.index.get(id).copied()
    }

    fn contains<Q>(&self, id: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<RowId>,
    {
        self.index.contains_key(id)
    }

    fn push(&mut self, id: RowId, row: Row) {
        self.index.insert(id, self.rows.len());
        self.rows.push(row);
    }

    /// Re-keys the rows by the grid's own key, enforcing identifier uniqueness.
    fn into_store(self, key: &KeySelector) -> Result<RowStore, GridError> {
        let mut store = RowStore::with_capacity_and_hasher(self.rows.len(), Default::default());
        for row in self.rows {
            let id = key.require("execute", &row)?;
            if store.contains_key(&id) {
                return Err(GridError::Conflict { id });
            }
            store.insert(id, row);
        }
        Ok(store)
    }
}
