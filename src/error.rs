// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Errors raised by builders, the executor and row sources.
use crate::RowId;
use thiserror::Error;

/// Every failure a grid operation can surface.
///
/// Builder methods fail with [`GridError::Validation`] before anything is queued.
/// `execute()` fails with [`GridError::NotFound`], [`GridError::Conflict`] or, for
/// rows whose identifier only goes missing under the final key configuration,
/// [`GridError::Validation`]; in all of these cases the grid keeps the state it had
/// before the call.
#[derive(Debug, Error)]
pub enum GridError {
    /// Malformed or empty input to a builder method.
    #[error("invalid input to `{op}`: {reason}")]
    Validation { op: &'static str, reason: String },

    /// An operation addressed a row identifier that is not in the row store.
    #[error("`{op}` addressed unknown row `{id}`")]
    NotFound { op: &'static str, id: RowId },

    /// A transaction would leave two rows with the same identifier.
    #[error("duplicate row identifier `{id}`")]
    Conflict { id: RowId },

    /// A builder was used in a state that does not allow the call.
    #[error(transparent)]
    State(#[from] StateError),

    /// An external row source failed to produce a page.
    #[error("row source failed: {0}")]
    RowSource(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl GridError {
    pub(crate) fn validation(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            op,
            reason: reason.into(),
        }
    }
}

/// Misuse of a builder's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    /// The builder's queue was already consumed by `execute()`.
    #[error("transaction was already executed")]
    Spent,
    /// `execute()` was called on a builder embedded through `grid_manager`; it
    /// executes together with its parent.
    #[error("nested transaction executes with its parent")]
    NestedExecute,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = GridError::validation("add", "no rows given");
        assert_eq!(err.to_string(), "invalid input to `add`: no rows given");

        let err = GridError::NotFound {
            op: "split",
            id: "7".into(),
        };
        assert_eq!(err.to_string(), "`split` addressed unknown row `7`");
    }

    #[test]
    fn state_errors_convert() {
        let err: GridError = StateError::Spent.into();
        assert!(matches!(err, GridError::State(StateError::Spent)));
        assert_eq!(err.to_string(), "transaction was already executed");
    }
}
