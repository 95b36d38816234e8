//! Reconciliation plans: the insert/update/delete partition of a diff.

use crate::value::Value;

/// An ordered set of positional rows sharing one column list.
///
/// Each plan branch carries its own columns because the three statements of
/// an entity bind different projections (inserts bind the natural columns,
/// updates lead with the target surrogate id, deletes bind the id filter).
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        RowSet {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Cell lookup by row index and column name, for tests and reports.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[col])
    }
}

/// Output of one reconciliation: three disjoint row sequences.
///
/// `to_delete` is `None` for append-only entities; it is present (possibly
/// empty) only when the entity's source is authoritative over deletions.
#[derive(Debug, Clone)]
pub struct Plan {
    pub entity: String,
    pub to_insert: RowSet,
    pub to_update: RowSet,
    pub to_delete: Option<RowSet>,
}

impl Plan {
    /// True when no branch carries any row, i.e. the stores are converged.
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.as_ref().map_or(true, |d| d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_is_empty() {
        let plan = Plan {
            entity: "mineral_log".into(),
            to_insert: RowSet::new(vec!["name".into()]),
            to_update: RowSet::new(vec!["id".into()]),
            to_delete: None,
        };
        assert!(plan.is_empty());

        let mut with_insert = plan.clone();
        with_insert.to_insert.push(vec![Value::Text("Opal".into())]);
        assert!(!with_insert.is_empty());

        let mut with_delete = plan;
        let mut deletes = RowSet::new(vec!["id".into()]);
        deletes.push(vec![Value::Int(7)]);
        with_delete.to_delete = Some(deletes);
        assert!(!with_delete.is_empty());
    }
}
