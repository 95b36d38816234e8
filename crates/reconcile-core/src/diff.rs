//! The key-based diff at the heart of every entity sync.
//!
//! [`reconcile`] computes, for one entity, the minimal insert/update/delete
//! partition that converges the target snapshot to the source snapshot:
//!
//! 1. Full outer join of target and source on the natural key, tagging every
//!    key as target-only, source-only, or both.
//! 2. Insert set = source-only rows, deduplicated by key (first occurrence
//!    wins; later duplicates are silently dropped - a pre-existing upstream
//!    data-quality condition that callers rely on).
//! 3. Update set = both-sides rows, deduplicated the same way, kept only
//!    when at least one tracked column differs (null-vs-null counts as
//!    equal, any other pairwise inequality as a difference).
//! 4. Delete set = target-only rows, produced only for entities whose source
//!    is the complete authoritative set.
//!
//! The function is pure: no I/O, no mutation of its inputs.

use crate::plan::{Plan, RowSet};
use crate::snapshot::Snapshot;
use crate::spec::EntitySpec;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Which store a precondition violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Target,
    Source,
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Target => f.write_str("target"),
            Store::Source => f.write_str("source"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// An empty required snapshot aborts the entity's sync; it is a
    /// precondition violation, not an empty-plan result.
    #[error("empty {store} snapshot for entity {entity}")]
    EmptySnapshot { entity: String, store: Store },

    #[error("entity {entity}: column {column} missing from {store} snapshot")]
    MissingColumn {
        entity: String,
        column: String,
        store: Store,
    },
}

/// A resolved natural-key value, hashable across the scalar universe.
#[derive(Debug, Clone)]
struct Key<'a>(Vec<&'a Value>);

impl<'a> Key<'a> {
    fn from_row(row: &'a [Value], columns: &[usize]) -> Self {
        Key(columns.iter().map(|&c| &row[c]).collect())
    }
}

impl PartialEq for Key<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.sync_eq(b))
    }
}

impl Eq for Key<'_> {}

impl Hash for Key<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in &self.0 {
            v.key_hash(state);
        }
    }
}

/// Resolve column names to positional indexes in one snapshot.
fn resolve(
    snapshot: &Snapshot,
    columns: &[String],
    store: Store,
    entity: &str,
) -> Result<Vec<usize>, ReconcileError> {
    columns
        .iter()
        .map(|c| {
            snapshot
                .column_index(c)
                .ok_or_else(|| ReconcileError::MissingColumn {
                    entity: entity.to_string(),
                    column: c.clone(),
                    store,
                })
        })
        .collect()
}

/// Where an update-row column is taken from after the join.
enum UpdateSide {
    Target(usize),
    Source(usize),
}

/// Diff `target` against `source` and produce the plan converging the
/// target to the source's state.
///
/// Both snapshots must be non-empty; an empty snapshot means the fetch that
/// produced it went wrong and the entity's sync must abort rather than mass
/// delete or mass insert.
pub fn reconcile(
    target: &Snapshot,
    source: &Snapshot,
    spec: &EntitySpec,
) -> Result<Plan, ReconcileError> {
    if target.is_empty() {
        return Err(ReconcileError::EmptySnapshot {
            entity: spec.entity.clone(),
            store: Store::Target,
        });
    }
    if source.is_empty() {
        return Err(ReconcileError::EmptySnapshot {
            entity: spec.entity.clone(),
            store: Store::Source,
        });
    }

    let t_key = resolve(target, &spec.key_columns, Store::Target, &spec.entity)?;
    let s_key = resolve(source, &spec.key_columns, Store::Source, &spec.entity)?;
    let s_tracked = resolve(source, &spec.tracked_columns, Store::Source, &spec.entity)?;
    let t_tracked = resolve(target, &spec.tracked_columns, Store::Target, &spec.entity)?;
    let s_insert = resolve(source, &spec.insert_columns, Store::Source, &spec.entity)?;
    let t_delete = if spec.source_authoritative {
        resolve(target, &spec.delete_columns, Store::Target, &spec.entity)?
    } else {
        Vec::new()
    };
    let s_required = resolve(
        source,
        &spec.source_required_any,
        Store::Source,
        &spec.entity,
    )?;

    // Update rows interleave both sides: tracked columns from the source,
    // everything else (surrogate id, join key) from the target.
    let update_sides = spec
        .update_columns
        .iter()
        .map(|c| {
            if spec.tracked_columns.contains(c) {
                let idx = source
                    .column_index(c)
                    .ok_or_else(|| ReconcileError::MissingColumn {
                        entity: spec.entity.clone(),
                        column: c.clone(),
                        store: Store::Source,
                    })?;
                Ok(UpdateSide::Source(idx))
            } else {
                let idx = target
                    .column_index(c)
                    .ok_or_else(|| ReconcileError::MissingColumn {
                        entity: spec.entity.clone(),
                        column: c.clone(),
                        store: Store::Target,
                    })?;
                Ok(UpdateSide::Target(idx))
            }
        })
        .collect::<Result<Vec<_>, ReconcileError>>()?;

    // Source-side pass: filter rows missing every required column, then
    // index by key, first occurrence winning.
    let mut source_order = Vec::new();
    let mut source_index: HashMap<Key, usize> = HashMap::new();
    for (i, row) in source.rows().iter().enumerate() {
        if !s_required.is_empty() && s_required.iter().all(|&c| row[c].is_null()) {
            continue;
        }
        source_order.push(i);
        source_index.entry(Key::from_row(row, &s_key)).or_insert(i);
    }

    let mut target_index: HashMap<Key, usize> = HashMap::new();
    for (i, row) in target.rows().iter().enumerate() {
        target_index.entry(Key::from_row(row, &t_key)).or_insert(i);
    }

    // Target-side pass in snapshot order: matched keys become update
    // candidates (first occurrence wins), unmatched keys become deletes for
    // authoritative sources.
    let mut to_update = RowSet::new(spec.update_columns.clone());
    let mut to_delete = RowSet::new(spec.delete_columns.clone());
    let mut seen_both: HashSet<Key> = HashSet::new();
    for t_row in target.rows() {
        let key = Key::from_row(t_row, &t_key);
        match source_index.get(&key) {
            Some(&s_i) => {
                if !seen_both.insert(key) {
                    continue;
                }
                let s_row = &source.rows()[s_i];
                let changed = t_tracked
                    .iter()
                    .zip(s_tracked.iter())
                    .any(|(&tc, &sc)| !t_row[tc].sync_eq(&s_row[sc]));
                if changed {
                    let row = update_sides
                        .iter()
                        .map(|side| match side {
                            UpdateSide::Target(c) => t_row[*c].clone(),
                            UpdateSide::Source(c) => s_row[*c].clone(),
                        })
                        .collect();
                    to_update.push(row);
                }
            }
            None => {
                if spec.source_authoritative {
                    to_delete.push(t_delete.iter().map(|&c| t_row[c].clone()).collect());
                }
            }
        }
    }

    // Source-side pass over retained rows: unmatched keys become inserts,
    // first occurrence winning.
    let mut to_insert = RowSet::new(spec.insert_columns.clone());
    let mut seen_insert: HashSet<Key> = HashSet::new();
    for &i in &source_order {
        let s_row = &source.rows()[i];
        let key = Key::from_row(s_row, &s_key);
        if target_index.contains_key(&key) {
            continue;
        }
        if !seen_insert.insert(key) {
            continue;
        }
        to_insert.push(s_insert.iter().map(|&c| s_row[c].clone()).collect());
    }

    Ok(Plan {
        entity: spec.entity.clone(),
        to_insert,
        to_update,
        to_delete: spec.source_authoritative.then_some(to_delete),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> EntitySpec {
        EntitySpec {
            entity: "mineral_log".into(),
            key_columns: vec!["name".into()],
            tracked_columns: vec!["mindat_id".into()],
            insert_columns: vec!["name".into(), "mindat_id".into()],
            update_columns: vec!["id".into(), "mindat_id".into()],
            delete_columns: vec!["id".into()],
            source_authoritative: false,
            source_required_any: vec![],
        }
    }

    fn target(rows: Vec<Vec<Value>>) -> Snapshot {
        Snapshot::new(
            "mineral_log",
            vec!["id".into(), "name".into(), "mindat_id".into()],
            rows,
        )
    }

    fn source(rows: Vec<Vec<Value>>) -> Snapshot {
        Snapshot::new(
            "minerals",
            vec!["name".into(), "mindat_id".into()],
            rows,
        )
    }

    #[test]
    fn test_quartz_opal_scenario() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Null,
        ]]);
        let source = source(vec![
            vec![Value::Text("Quartz".into()), Value::Int(101)],
            vec![Value::Text("Opal".into()), Value::Int(205)],
        ]);

        let plan = reconcile(&target, &source, &spec()).unwrap();

        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(
            plan.to_insert.get(0, "name"),
            Some(&Value::Text("Opal".into()))
        );
        assert_eq!(plan.to_insert.get(0, "mindat_id"), Some(&Value::Int(205)));

        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update.get(0, "id"), Some(&Value::Int(1)));
        assert_eq!(plan.to_update.get(0, "mindat_id"), Some(&Value::Int(101)));

        assert!(plan.to_delete.is_none());
    }

    #[test]
    fn test_identical_snapshots_produce_empty_plan() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Int(101),
        ]]);
        let source = source(vec![vec![Value::Text("Quartz".into()), Value::Int(101)]]);

        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_null_vs_null_is_not_a_change() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Null,
        ]]);
        let source = source(vec![vec![Value::Text("Quartz".into()), Value::Null]]);

        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert!(plan.to_update.is_empty());
    }

    #[test]
    fn test_null_vs_value_is_a_change_both_directions() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Int(101),
        ]]);
        let source = source(vec![vec![Value::Text("Quartz".into()), Value::Null]]);

        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update.get(0, "mindat_id"), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_source_keys_first_wins() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Int(101),
        ]]);
        let source = source(vec![
            vec![Value::Text("A".into()), Value::Int(1)],
            vec![Value::Text("A".into()), Value::Int(2)],
        ]);

        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert.get(0, "mindat_id"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_duplicate_matched_keys_first_source_occurrence_wins() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Null,
        ]]);
        let source = source(vec![
            vec![Value::Text("Quartz".into()), Value::Int(101)],
            vec![Value::Text("Quartz".into()), Value::Int(999)],
        ]);

        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update.get(0, "mindat_id"), Some(&Value::Int(101)));
        // the duplicate does not resurface as an insert
        assert!(plan.to_insert.is_empty());
    }

    #[test]
    fn test_delete_only_for_authoritative_source() {
        let target = target(vec![
            vec![Value::Int(1), Value::Text("Quartz".into()), Value::Int(101)],
            vec![Value::Int(2), Value::Text("Fakeite".into()), Value::Int(999)],
        ]);
        let source = source(vec![vec![Value::Text("Quartz".into()), Value::Int(101)]]);

        // append-only entity: no delete branch at all
        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert!(plan.to_delete.is_none());

        // authoritative source: the orphan is scheduled for deletion
        let mut authoritative = spec();
        authoritative.source_authoritative = true;
        let plan = reconcile(&target, &source, &authoritative).unwrap();
        let deletes = plan.to_delete.unwrap();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes.get(0, "id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_idempotence_after_convergence() {
        // Simulate the state after the Quartz/Opal plan was applied.
        let target = target(vec![
            vec![Value::Int(1), Value::Text("Quartz".into()), Value::Int(101)],
            vec![Value::Int(2), Value::Text("Opal".into()), Value::Int(205)],
        ]);
        let source = source(vec![
            vec![Value::Text("Quartz".into()), Value::Int(101)],
            vec![Value::Text("Opal".into()), Value::Int(205)],
        ]);

        let plan = reconcile(&target, &source, &spec()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_empty_snapshot_is_a_precondition_violation() {
        let empty_target = target(vec![]);
        let full_source = source(vec![vec![Value::Text("Quartz".into()), Value::Int(101)]]);
        let err = reconcile(&empty_target, &full_source, &spec()).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::EmptySnapshot {
                store: Store::Target,
                ..
            }
        ));

        let full_target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Int(101),
        ]]);
        let empty_source = source(vec![]);
        let err = reconcile(&full_target, &empty_source, &spec()).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::EmptySnapshot {
                store: Store::Source,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let target = Snapshot::new(
            "mineral_log",
            vec!["id".into(), "name".into()],
            vec![vec![Value::Int(1), Value::Text("Quartz".into())]],
        );
        let source = source(vec![vec![Value::Text("Quartz".into()), Value::Int(101)]]);

        let err = reconcile(&target, &source, &spec()).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingColumn { .. }));
    }

    #[test]
    fn test_source_required_any_filters_all_null_rows() {
        let target = target(vec![vec![
            Value::Int(1),
            Value::Text("Quartz".into()),
            Value::Int(101),
        ]]);
        let source = source(vec![
            vec![Value::Text("Quartz".into()), Value::Int(101)],
            vec![Value::Text("Ghostite".into()), Value::Null],
        ]);

        let mut filtered = spec();
        filtered.source_required_any = vec!["mindat_id".into()];
        let plan = reconcile(&target, &source, &filtered).unwrap();
        // the all-null row never reaches the join, so nothing is inserted
        assert!(plan.to_insert.is_empty());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_compound_key() {
        let target = Snapshot::new(
            "mineral_formula",
            vec!["name".into(), "formula".into(), "source_id".into()],
            vec![vec![
                Value::Text("Quartz".into()),
                Value::Text("SiO2".into()),
                Value::Int(2),
            ]],
        );
        let source = Snapshot::new(
            "minerals",
            vec!["name".into(), "formula".into(), "source_id".into()],
            vec![
                vec![
                    Value::Text("Quartz".into()),
                    Value::Text("SiO2".into()),
                    Value::Int(2),
                ],
                // same mineral, different formula source: a distinct key
                vec![
                    Value::Text("Quartz".into()),
                    Value::Text("SiO_2".into()),
                    Value::Int(3),
                ],
            ],
        );

        let spec = EntitySpec {
            entity: "mineral_formula".into(),
            key_columns: vec!["name".into(), "source_id".into()],
            tracked_columns: vec![],
            insert_columns: vec!["name".into(), "formula".into(), "source_id".into()],
            update_columns: vec![],
            delete_columns: vec![],
            source_authoritative: false,
            source_required_any: vec![],
        };

        let plan = reconcile(&target, &source, &spec).unwrap();
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert.get(0, "source_id"), Some(&Value::Int(3)));
        // no tracked columns: matched rows never update
        assert!(plan.to_update.is_empty());
    }
}
