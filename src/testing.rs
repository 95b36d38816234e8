//! Shared test helpers.
//!
//! Builders for snapshots and values used across unit and integration
//! tests, so scenario tables stay readable.

use reconcile_core::{Snapshot, Value};

/// Build a snapshot from string column names and value rows.
pub fn snapshot(entity: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Snapshot {
    Snapshot::new(
        entity,
        columns.iter().map(|c| c.to_string()).collect(),
        rows,
    )
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn int(i: i64) -> Value {
    Value::Int(i)
}

pub fn null() -> Value {
    Value::Null
}
