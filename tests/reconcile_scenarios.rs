//! Entity-level reconciliation scenarios, run against the real catalog
//! configurations with in-memory snapshots.

use mineral_sync::entities;
use mineral_sync::normalize::{
    prepare_minerals, prepare_minerals_formula, FORMULA_SOURCE_IMA, FORMULA_SOURCE_MINDAT,
};
use mineral_sync::testing::{int, null, snapshot, text};
use mineral_sync::{reconcile, Value};

#[test]
fn test_mineral_log_insert_and_update() {
    let entity = entities::mineral_log();

    let target = snapshot(
        "mineral_log",
        &["id", "name", "description", "mindat_id", "ima_symbol"],
        vec![vec![
            text("6e9496c2-7f7d-4a2c-9d4e-7a2f6f1d0a01"),
            text("Quartz"),
            text("Silica group mineral"),
            null(),
            text("Qz"),
        ]],
    );
    let source = snapshot(
        "minerals",
        &["name", "description", "mindat_id", "ima_symbol"],
        vec![
            vec![text("Quartz"), text("Silica group mineral"), int(101), text("Qz")],
            vec![text("Opal"), null(), int(205), null()],
        ],
    );

    let plan = reconcile(&target, &source, &entity.spec).unwrap();

    // Opal is unknown to the target and becomes an insert with source values
    assert_eq!(plan.to_insert.len(), 1);
    assert_eq!(plan.to_insert.get(0, "name"), Some(&text("Opal")));
    assert_eq!(plan.to_insert.get(0, "mindat_id"), Some(&int(205)));

    // Quartz gained a mindat_id; the update carries the target's surrogate id
    assert_eq!(plan.to_update.len(), 1);
    assert_eq!(
        plan.to_update.get(0, "id"),
        Some(&text("6e9496c2-7f7d-4a2c-9d4e-7a2f6f1d0a01"))
    );
    assert_eq!(plan.to_update.get(0, "mindat_id"), Some(&int(101)));

    // mineral_log is append-only
    assert!(plan.to_delete.is_none());
}

#[test]
fn test_mineral_log_converged_is_empty_and_idempotent() {
    let entity = entities::mineral_log();

    let target = snapshot(
        "mineral_log",
        &["id", "name", "description", "mindat_id", "ima_symbol"],
        vec![
            vec![int(1), text("Quartz"), null(), int(101), text("Qz")],
            vec![int(2), text("Opal"), null(), int(205), null()],
        ],
    );
    let source = snapshot(
        "minerals",
        &["name", "description", "mindat_id", "ima_symbol"],
        vec![
            vec![text("Quartz"), null(), int(101), text("Qz")],
            vec![text("Opal"), null(), int(205), null()],
        ],
    );

    let first = reconcile(&target, &source, &entity.spec).unwrap();
    assert!(first.is_empty());

    // a second run over unchanged snapshots computes the same empty plan
    let second = reconcile(&target, &source, &entity.spec).unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_mineral_history_requires_at_least_one_year() {
    let entity = entities::mineral_history();

    let target = snapshot(
        "mineral_history",
        &["id", "name", "discovery_year", "ima_year", "approval_year", "publication_year"],
        vec![vec![int(11), text("Quartz"), int(1820), null(), null(), null()]],
    );
    let source = snapshot(
        "minerals",
        &["name", "discovery_year", "ima_year", "approval_year", "publication_year"],
        vec![
            // all four years null: no history row to create
            vec![text("Datelessite"), null(), null(), null(), null()],
            vec![text("Quartz"), int(1820), null(), null(), null()],
        ],
    );

    let plan = reconcile(&target, &source, &entity.spec).unwrap();
    assert!(plan.to_insert.is_empty());
    assert!(plan.to_update.is_empty());
}

#[test]
fn test_mineral_formula_compound_key_and_insert_only() {
    let entity = entities::mineral_formula();

    let minerals = snapshot(
        "minerals",
        &["name", "formula", "imaformula", "note"],
        vec![vec![
            text("Quartz"),
            text("SiO2"),
            text("SiO_2_"),
            null(),
        ]],
    );
    let source = prepare_minerals_formula(&minerals);

    // the display formula is already recorded; the IMA row is new
    let target = snapshot(
        "mineral_formula",
        &["name", "mindat_id", "formula", "note", "source_id"],
        vec![vec![
            text("Quartz"),
            int(101),
            text("SiO2"),
            null(),
            int(FORMULA_SOURCE_MINDAT),
        ]],
    );

    let plan = reconcile(&target, &source, &entity.spec).unwrap();
    assert_eq!(plan.to_insert.len(), 1);
    assert_eq!(
        plan.to_insert.get(0, "source_id"),
        Some(&int(FORMULA_SOURCE_IMA))
    );
    // recorded formulas are never rewritten
    assert!(plan.to_update.is_empty());
    assert!(plan.to_delete.is_none());
}

#[test]
fn test_relation_suggestion_full_lifecycle() {
    let entity = entities::mineral_relation_suggestion();

    let target = snapshot(
        "mineral_relation_suggestion",
        &["id", "mineral_id", "relation_id", "relation_type_id"],
        vec![
            vec![int(1), int(101), int(205), int(1)],
            // no longer present upstream
            vec![int(2), int(101), int(333), int(2)],
        ],
    );
    let source = snapshot(
        "relations",
        &["id", "mineral_id", "relation_id", "relation_type_id"],
        vec![
            // relation type changed
            vec![int(1), int(101), int(205), int(4)],
            // new suggestion
            vec![int(3), int(205), int(333), int(1)],
        ],
    );

    let plan = reconcile(&target, &source, &entity.spec).unwrap();

    assert_eq!(plan.to_insert.len(), 1);
    assert_eq!(plan.to_insert.get(0, "id"), Some(&int(3)));

    assert_eq!(plan.to_update.len(), 1);
    assert_eq!(plan.to_update.get(0, "id"), Some(&int(1)));
    assert_eq!(plan.to_update.get(0, "relation_type_id"), Some(&int(4)));

    // the source is authoritative: the orphan is deleted
    let deletes = plan.to_delete.expect("authoritative entity has a delete branch");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes.get(0, "id"), Some(&int(2)));
    assert_eq!(deletes.get(0, "mineral_id"), Some(&int(101)));
}

#[test]
fn test_duplicate_source_minerals_collapse_first_wins() {
    let entity = entities::mineral_log();

    let target = snapshot(
        "mineral_log",
        &["id", "name", "description", "mindat_id", "ima_symbol"],
        vec![vec![int(1), text("Quartz"), null(), int(101), null()]],
    );
    // the same new mineral twice, a pre-existing upstream data-quality issue
    let source = snapshot(
        "minerals",
        &["name", "description", "mindat_id", "ima_symbol"],
        vec![
            vec![text("Quartz"), null(), int(101), null()],
            vec![text("Coesite"), text("first occurrence"), int(301), null()],
            vec![text("Coesite"), text("second occurrence"), int(302), null()],
        ],
    );

    let plan = reconcile(&target, &source, &entity.spec).unwrap();
    assert_eq!(plan.to_insert.len(), 1);
    assert_eq!(
        plan.to_insert.get(0, "description"),
        Some(&text("first occurrence"))
    );
    assert_eq!(plan.to_insert.get(0, "mindat_id"), Some(&int(301)));
}

#[test]
fn test_normalized_extract_flows_through_the_diff() {
    let entity = entities::mineral_log();

    // raw extract the way Mindat hands it over: empty strings and zeros
    let raw = snapshot(
        "minerals",
        &["name", "description", "mindat_id", "ima_symbol"],
        vec![vec![text("Quartz"), text(""), int(101), text("")]],
    );
    let source = prepare_minerals(&raw);

    let target = snapshot(
        "mineral_log",
        &["id", "name", "description", "mindat_id", "ima_symbol"],
        vec![vec![int(1), text("Quartz"), null(), int(101), null()]],
    );

    // after normalization the empty strings are nulls, so nothing changed
    let plan = reconcile(&target, &source, &entity.spec).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn test_empty_target_snapshot_aborts_the_entity() {
    let entity = entities::mineral_log();

    let target = snapshot(
        "mineral_log",
        &["id", "name", "description", "mindat_id", "ima_symbol"],
        vec![],
    );
    let source = snapshot(
        "minerals",
        &["name", "description", "mindat_id", "ima_symbol"],
        vec![vec![text("Quartz"), null(), int(101), null()]],
    );

    assert!(reconcile(&target, &source, &entity.spec).is_err());
}

#[test]
fn test_update_rows_bind_in_statement_column_order() {
    // plan branch columns must line up with the statement template so the
    // executor can bind positionally without remapping
    for entity in entities::catalog() {
        assert_eq!(
            entity.spec.insert_columns,
            entity
                .insert
                .columns
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
        );
        if let Some(update) = &entity.update {
            assert_eq!(
                entity.spec.update_columns,
                update
                    .columns
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
            );
        }
        if let Some(delete) = &entity.delete {
            assert_eq!(
                entity.spec.delete_columns,
                delete
                    .columns
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
            );
        }
    }
}

#[test]
fn test_zero_mindat_id_coerces_to_null_before_comparison() {
    let entity = entities::mineral_log();

    let raw = snapshot(
        "minerals",
        &["name", "description", "mindat_id", "ima_symbol"],
        vec![vec![text("Quartz"), null(), Value::Int(0), null()]],
    );
    let source = prepare_minerals(&raw);

    let target = snapshot(
        "mineral_log",
        &["id", "name", "description", "mindat_id", "ima_symbol"],
        vec![vec![int(1), text("Quartz"), null(), null(), null()]],
    );

    let plan = reconcile(&target, &source, &entity.spec).unwrap();
    assert!(plan.is_empty(), "zero and null must compare equal after coercion");
}
