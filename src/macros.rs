// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for creating a [`Row`](crate::Row) from a JSON object literal.
///
/// Takes the same syntax as the body of `serde_json::json!({ .. })`.
///
/// ```rust
/// # use fibogrid::row;
/// let row = row! { "id": "1", "meta": { "owner": "ada" }, "tags": ["a", "b"] };
/// assert_eq!(row["meta"]["owner"], "ada");
/// ```
#[macro_export]
macro_rules! row {
    ($($body:tt)*) => {
        match $crate::__private::serde_json::json!({ $($body)* }) {
            $crate::__private::serde_json::Value::Object(map) => $crate::Row::from(map),
            _ => unreachable!("an object literal always produces an object"),
        }
    };
}

/// Convenience macro for creating a `Vec` of [`Row`](crate::Row)s.
///
/// ```rust
/// # use fibogrid::rows;
/// let rows = rows![
///     { "id": "1", "name": "Ada" },
///     { "id": "2", "name": "Grace" },
/// ];
/// assert_eq!(rows.len(), 2);
/// ```
#[macro_export]
macro_rules! rows {
    ($({ $($body:tt)* }),* $(,)?) => {
        vec![$($crate::row! { $($body)* }),*]
    };
}
