// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Deep merge of partial rows.
//!
//! Objects merge field by field and recursively. Every other value, including arrays
//! and `null`, replaces what was there.
use serde_json::{Map, Value};

/// Merges `patch` into `target`.
pub fn deep_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (field, incoming) in patch {
        let Value::Object(nested) = incoming else {
            target.insert(field, incoming);
            continue;
        };
        if let Some(Value::Object(existing)) = target.get_mut(&field) {
            deep_merge(existing, nested);
        } else {
            target.insert(field, Value::Object(nested));
        }
    }
}

/// Merges `patch` into `target` when both are objects, otherwise replaces `target`.
pub fn deep_merge_value(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(nested)) => deep_merge(existing, nested),
        (target, patch) => *target = patch,
    }
}
