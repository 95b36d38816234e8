//! Per-entity reconciliation configuration.

/// Configuration record parameterizing [`crate::reconcile`] for one entity.
///
/// The shared diff algorithm never changes per entity; what varies is the
/// natural key, which columns may trigger an update, how plan rows are
/// projected for each statement, and whether the source is authoritative
/// over deletions.
#[derive(Debug, Clone)]
pub struct EntitySpec {
    /// Entity (target table) name, used in plans, reports, and errors.
    pub entity: String,

    /// Natural key columns; must exist in both snapshots.
    pub key_columns: Vec<String>,

    /// Columns eligible to trigger an update. An entity with no tracked
    /// columns is insert-only: matched rows always have an empty change
    /// projection.
    pub tracked_columns: Vec<String>,

    /// Positional projection of an insert row, taken from the source side.
    pub insert_columns: Vec<String>,

    /// Positional projection of an update row. Tracked columns come from the
    /// source side; everything else (the target surrogate id, the join key)
    /// comes from the target side.
    pub update_columns: Vec<String>,

    /// Positional projection of a delete row, taken from the target side.
    /// Ignored unless `source_authoritative`.
    pub delete_columns: Vec<String>,

    /// Whether the source is the complete authoritative set for this entity.
    /// Only then does the plan carry a delete branch.
    pub source_authoritative: bool,

    /// Source rows where every listed column is null are dropped before the
    /// join. Empty means no filtering.
    pub source_required_any: Vec<String>,
}
