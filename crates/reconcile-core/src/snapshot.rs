//! Immutable rectangular extracts of one entity's rows from one store.

use crate::value::Value;
use chrono::{DateTime, Utc};

/// A point-in-time extract of one entity table from one store.
///
/// Snapshots are immutable once taken: reconciliation never mutates them,
/// and normalization passes produce new snapshots instead of editing in
/// place. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entity: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(entity: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let entity = entity.into();
        debug_assert!(
            rows.iter().all(|r| r.len() == columns.len()),
            "ragged snapshot for {entity}"
        );
        Snapshot {
            entity,
            columns,
            rows,
            taken_at: Utc::now(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positional index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// A copy of this snapshot with rows ordered by the given column,
    /// nulls last. The receiver is untouched.
    pub fn sorted_by(&self, column: &str) -> Self {
        let mut rows = self.rows.clone();
        if let Some(col) = self.column_index(column) {
            rows.sort_by(|a, b| a[col].sort_cmp(&b[col]));
        }
        Snapshot {
            entity: self.entity.clone(),
            columns: self.columns.clone(),
            rows,
            taken_at: self.taken_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::new(
            "mineral_log",
            vec!["name".into(), "mindat_id".into()],
            vec![
                vec![Value::Text("Quartz".into()), Value::Int(101)],
                vec![Value::Text("Opal".into()), Value::Null],
            ],
        )
    }

    #[test]
    fn test_column_lookup() {
        let snap = sample();
        assert_eq!(snap.column_index("mindat_id"), Some(1));
        assert_eq!(snap.column_index("missing"), None);
        assert_eq!(snap.get(0, "name"), Some(&Value::Text("Quartz".into())));
        assert_eq!(snap.get(1, "mindat_id"), Some(&Value::Null));
    }

    #[test]
    fn test_sorted_by_leaves_original_untouched() {
        let snap = sample();
        let sorted = snap.sorted_by("name");
        assert_eq!(sorted.get(0, "name"), Some(&Value::Text("Opal".into())));
        // original order preserved
        assert_eq!(snap.get(0, "name"), Some(&Value::Text("Quartz".into())));
    }

    #[test]
    fn test_sorted_by_nulls_last() {
        let snap = sample();
        let sorted = snap.sorted_by("mindat_id");
        assert_eq!(sorted.get(0, "mindat_id"), Some(&Value::Int(101)));
        assert_eq!(sorted.get(1, "mindat_id"), Some(&Value::Null));
    }
}
