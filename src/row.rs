// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Rows, row identifiers and identifier extraction.
use crate::GridError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    borrow::Borrow,
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// The unique identifier of a [`Row`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Reads an identifier out of a JSON value.
    ///
    /// Non-empty strings are taken as-is and numbers use their JSON rendering, so
    /// `1` and `"1"` address the same row. Anything else is not an identifier.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<RowId> for Value {
    fn from(id: RowId) -> Self {
        Value::String(id.0)
    }
}

impl Borrow<str> for RowId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RowId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RowId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One record of the row store: a JSON object with caller-defined fields.
///
/// A row dereferences to its [`serde_json::Map`], so fields are read and written
/// with the usual map methods.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Converts a JSON value into a row.
    ///
    /// # Errors
    ///
    /// Fails with [`GridError::Validation`] unless `value` is an object.
    pub fn from_value(value: Value) -> Result<Self, GridError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(GridError::validation(
                "row",
                format!("expected a JSON object, got {other}"),
            )),
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Object(row.0)
    }
}

impl TryFrom<Value> for Row {
    type Error = GridError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl Deref for Row {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Row {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Caller-supplied identifier accessor.
pub type KeyFn = Arc<dyn Fn(&Row) -> Option<RowId> + Send + Sync>;

/// Decides how the identifier of a row is found.
#[derive(Clone)]
pub enum KeySelector {
    /// Read the identifier from a top-level field.
    Field(String),
    /// Ask an accessor closure.
    Accessor(KeyFn),
}

impl KeySelector {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn extract(&self, row: &Row) -> Option<RowId> {
        match self {
            Self::Field(field) => row.get(field).and_then(RowId::from_value),
            Self::Accessor(f) => f(row),
        }
    }

    /// Like [`KeySelector::extract`], but a missing identifier is a validation error
    /// attributed to `op`.
    pub(crate) fn require(&self, op: &'static str, row: &Row) -> Result<RowId, GridError> {
        self.extract(row).ok_or_else(|| {
            let reason = match self {
                Self::Field(field) => format!("row has no identifier in field `{field}`"),
                Self::Accessor(_) => "key accessor returned no identifier".to_string(),
            };
            GridError::validation(op, reason)
        })
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Self::Accessor(_) => f.write_str("Accessor(..)"),
        }
    }
}
