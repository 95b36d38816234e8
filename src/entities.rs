//! The catalog of synchronized entities.
//!
//! Every entity is the same diff algorithm under a different configuration
//! record: natural key, tracked columns, statement templates, and which
//! prepared source snapshot it reconciles against. Catalog order is the
//! order entities sync in a full run.

use crate::executor::{Operation, StatementTemplate};
use crate::queries;
use reconcile_core::EntitySpec;

/// Which prepared source snapshot an entity diffs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The normalized minerals extract.
    Minerals,
    /// Formula rows derived from the minerals extract (sources 2 and 3).
    MineralsFormula,
    /// Context blobs derived from the minerals extract.
    MineralsContext,
    /// The Mindat relations table.
    Relations,
}

/// One synchronized entity: diff configuration plus its statements.
pub struct EntitySync {
    pub spec: EntitySpec,
    pub target_query: &'static str,
    pub source: SourceKind,
    pub insert: StatementTemplate,
    pub update: Option<StatementTemplate>,
    pub delete: Option<StatementTemplate>,
}

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn mineral_log() -> EntitySync {
    EntitySync {
        spec: EntitySpec {
            entity: "mineral_log".into(),
            key_columns: cols(&["name"]),
            tracked_columns: cols(&["description", "mindat_id", "ima_symbol"]),
            insert_columns: cols(&["name", "description", "mindat_id", "ima_symbol"]),
            update_columns: cols(&["id", "description", "mindat_id", "ima_symbol"]),
            delete_columns: vec![],
            source_authoritative: false,
            source_required_any: vec![],
        },
        target_query: queries::GET_MINERAL_LOG,
        source: SourceKind::Minerals,
        insert: StatementTemplate {
            operation: Operation::Insert,
            columns: &["name", "description", "mindat_id", "ima_symbol"],
            sql: queries::INSERT_MINERAL_LOG,
        },
        update: Some(StatementTemplate {
            operation: Operation::Update,
            columns: &["id", "description", "mindat_id", "ima_symbol"],
            sql: queries::UPDATE_MINERAL_LOG,
        }),
        delete: None,
    }
}

pub fn mineral_history() -> EntitySync {
    let years = ["discovery_year", "ima_year", "approval_year", "publication_year"];
    EntitySync {
        spec: EntitySpec {
            entity: "mineral_history".into(),
            key_columns: cols(&["name"]),
            tracked_columns: cols(&years),
            insert_columns: cols(&["name", "discovery_year", "ima_year", "approval_year", "publication_year"]),
            update_columns: cols(&["id", "discovery_year", "ima_year", "approval_year", "publication_year"]),
            delete_columns: vec![],
            source_authoritative: false,
            // minerals with no recorded dates have no history row
            source_required_any: cols(&years),
        },
        target_query: queries::GET_MINERAL_HISTORY,
        source: SourceKind::Minerals,
        insert: StatementTemplate {
            operation: Operation::Insert,
            columns: &["name", "discovery_year", "ima_year", "approval_year", "publication_year"],
            sql: queries::INSERT_MINERAL_HISTORY,
        },
        update: Some(StatementTemplate {
            operation: Operation::Update,
            columns: &["id", "discovery_year", "ima_year", "approval_year", "publication_year"],
            sql: queries::UPDATE_MINERAL_HISTORY,
        }),
        delete: None,
    }
}

pub fn mineral_formula() -> EntitySync {
    EntitySync {
        spec: EntitySpec {
            entity: "mineral_formula".into(),
            key_columns: cols(&["name", "source_id"]),
            // insert-only: an already-recorded formula is never rewritten
            tracked_columns: vec![],
            insert_columns: cols(&["name", "formula", "note", "source_id"]),
            update_columns: vec![],
            delete_columns: vec![],
            source_authoritative: false,
            source_required_any: cols(&["formula", "note"]),
        },
        target_query: queries::GET_MINERAL_FORMULA,
        source: SourceKind::MineralsFormula,
        insert: StatementTemplate {
            operation: Operation::Insert,
            columns: &["name", "formula", "note", "source_id"],
            sql: queries::INSERT_MINERAL_FORMULA,
        },
        update: None,
        delete: None,
    }
}

pub fn mineral_crystallography() -> EntitySync {
    EntitySync {
        spec: EntitySpec {
            entity: "mineral_crystallography".into(),
            key_columns: cols(&["name"]),
            tracked_columns: cols(&["crystal_system"]),
            insert_columns: cols(&["name", "crystal_system"]),
            update_columns: cols(&["name", "crystal_system"]),
            delete_columns: vec![],
            source_authoritative: false,
            source_required_any: cols(&["crystal_system"]),
        },
        target_query: queries::GET_MINERAL_CRYSTALLOGRAPHY,
        source: SourceKind::Minerals,
        insert: StatementTemplate {
            operation: Operation::Insert,
            columns: &["name", "crystal_system"],
            sql: queries::INSERT_MINERAL_CRYSTALLOGRAPHY,
        },
        update: Some(StatementTemplate {
            operation: Operation::Update,
            columns: &["name", "crystal_system"],
            sql: queries::UPDATE_MINERAL_CRYSTALLOGRAPHY,
        }),
        delete: None,
    }
}

pub fn mineral_relation_suggestion() -> EntitySync {
    let columns = ["id", "mineral_id", "relation_id", "relation_type_id"];
    EntitySync {
        spec: EntitySpec {
            entity: "mineral_relation_suggestion".into(),
            key_columns: cols(&["id"]),
            tracked_columns: cols(&["mineral_id", "relation_id", "relation_type_id"]),
            insert_columns: cols(&columns),
            update_columns: cols(&columns),
            delete_columns: cols(&["id", "mineral_id"]),
            // Mindat's relations table is the complete set; suggestions it
            // no longer carries are removed
            source_authoritative: true,
            source_required_any: cols(&["mineral_id", "relation_id", "relation_type_id"]),
        },
        target_query: queries::GET_MINERAL_RELATION_SUGGESTION,
        source: SourceKind::Relations,
        insert: StatementTemplate {
            operation: Operation::Insert,
            columns: &["id", "mineral_id", "relation_id", "relation_type_id"],
            sql: queries::INSERT_MINERAL_RELATION_SUGGESTION,
        },
        update: Some(StatementTemplate {
            operation: Operation::Update,
            columns: &["id", "mineral_id", "relation_id", "relation_type_id"],
            sql: queries::UPDATE_MINERAL_RELATION_SUGGESTION,
        }),
        delete: Some(StatementTemplate {
            operation: Operation::Delete,
            columns: &["id", "mineral_id"],
            sql: queries::DELETE_MINERAL_RELATION_SUGGESTION,
        }),
    }
}

pub fn mineral_context() -> EntitySync {
    EntitySync {
        spec: EntitySpec {
            entity: "mineral_context".into(),
            key_columns: cols(&["name", "context_id"]),
            tracked_columns: vec![],
            insert_columns: cols(&["name", "data", "context_id"]),
            update_columns: vec![],
            delete_columns: vec![],
            source_authoritative: false,
            source_required_any: cols(&["data"]),
        },
        target_query: queries::GET_MINERAL_CONTEXT,
        source: SourceKind::MineralsContext,
        insert: StatementTemplate {
            operation: Operation::Insert,
            columns: &["name", "data", "context_id"],
            sql: queries::INSERT_MINERAL_CONTEXT,
        },
        update: None,
        delete: None,
    }
}

/// Every synchronized entity, in sync order.
pub fn catalog() -> Vec<EntitySync> {
    vec![
        mineral_log(),
        mineral_history(),
        mineral_formula(),
        mineral_crystallography(),
        mineral_relation_suggestion(),
        mineral_context(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 6);
        // mineral_log syncs first so the statements that resolve names
        // against it see the freshly inserted minerals
        assert_eq!(catalog[0].spec.entity, "mineral_log");

        for entity in &catalog {
            assert!(!entity.spec.key_columns.is_empty(), "{}", entity.spec.entity);
            assert_eq!(
                entity.insert.columns.len(),
                entity.spec.insert_columns.len(),
                "{}",
                entity.spec.entity
            );
            if let Some(update) = &entity.update {
                assert_eq!(update.columns.len(), entity.spec.update_columns.len());
                assert!(!entity.spec.tracked_columns.is_empty());
            }
            if let Some(delete) = &entity.delete {
                assert!(entity.spec.source_authoritative);
                assert_eq!(delete.columns.len(), entity.spec.delete_columns.len());
            }
            assert!(entity.insert.sql.contains("{values}"));
        }
    }

    #[test]
    fn test_only_relation_suggestions_delete() {
        for entity in catalog() {
            let deletes = entity.spec.source_authoritative;
            assert_eq!(deletes, entity.spec.entity == "mineral_relation_suggestion");
            assert_eq!(deletes, entity.delete.is_some());
        }
    }

    #[test]
    fn test_insert_only_entities_have_no_tracked_columns() {
        for entity in catalog() {
            if entity.update.is_none() {
                assert!(
                    entity.spec.tracked_columns.is_empty(),
                    "{} has tracked columns but no update statement",
                    entity.spec.entity
                );
            }
        }
    }
}
