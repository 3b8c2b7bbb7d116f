// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use crate::{GridError, KeyFn, KeySelector, Row, RowId, model::SelectionMode};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Configuration of a [`Grid`](crate::Grid).
///
/// Deserializes from camelCase JSON with every field optional:
///
/// ```
/// use fibogrid::GridOptions;
///
/// let options: GridOptions = serde_json::from_str(r#"{ "keyField": "sku", "pageSize": 25 }"#)?;
/// assert_eq!(options.key_field, "sku");
/// assert_eq!(options.children_field, "children");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridOptions {
    /// Field holding the row identifier.
    pub key_field: String,
    /// Identifier accessor. Takes precedence over `key_field`.
    #[serde(skip)]
    pub key_fn: Option<KeyFn>,
    /// Field `split(.., as_child = true)` nests clones under.
    pub children_field: String,
    pub page_size: usize,
    pub selection_mode: SelectionMode,
    pub quick_filter_case_sensitive: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            key_field: "id".to_string(),
            key_fn: None,
            children_field: "children".to_string(),
            page_size: 100,
            selection_mode: SelectionMode::default(),
            quick_filter_case_sensitive: false,
        }
    }
}

impl GridOptions {
    #[must_use]
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    #[must_use]
    pub fn with_key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> Option<RowId> + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    /// The selector row identity is stored under.
    pub fn key_selector(&self) -> KeySelector {
        match &self.key_fn {
            Some(f) => KeySelector::Accessor(Arc::clone(f)),
            None => KeySelector::Field(self.key_field.clone()),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), GridError> {
        if self.page_size == 0 {
            return Err(GridError::validation("options", "page size must be positive"));
        }
        if self.key_fn.is_none() && self.key_field.is_empty() {
            return Err(GridError::validation("options", "key field must not be empty"));
        }
        if self.children_field.is_empty() {
            return Err(GridError::validation(
                "options",
                "children field must not be empty",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for GridOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOptions")
            .field("key_field", &self.key_field)
            .field("key_fn", &self.key_fn.as_ref().map(|_| ".."))
            .field("children_field", &self.children_field)
            .field("page_size", &self.page_size)
            .field("selection_mode", &self.selection_mode)
            .field("quick_filter_case_sensitive", &self.quick_filter_case_sensitive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = GridOptions::default();
        assert_eq!(options.key_field, "id");
        assert_eq!(options.page_size, 100);
        assert_eq!(options.selection_mode, SelectionMode::Multiple);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = GridOptions::default().with_page_size(0).validate().unwrap_err();
        assert!(matches!(err, GridError::Validation { op: "options", .. }));
    }

    #[test]
    fn key_fn_wins_over_field() {
        let options = GridOptions::default()
            .with_key_field("")
            .with_key_fn(|row| row.get("sku").and_then(RowId::from_value));
        assert!(options.validate().is_ok());
        assert!(matches!(options.key_selector(), KeySelector::Accessor(_)));
    }

    #[test]
    fn deserializes_selection_mode() {
        let options: GridOptions =
            serde_json::from_str(r#"{ "selectionMode": "single" }"#).unwrap();
        assert_eq!(options.selection_mode, SelectionMode::Single);
        assert_eq!(options.page_size, 100);
    }
}
