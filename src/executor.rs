//! Batched application of one plan branch.
//!
//! Each non-empty branch becomes a single statement round-trip: the
//! `{values}` marker in the template expands into one placeholder group per
//! row, every row binds positionally, and the whole branch commits or rolls
//! back as a unit. Branch atomicity is the boundary - a failing update never
//! rolls back the entity's already-committed insert branch.

use crate::error::SyncError;
use crate::pool::TargetPool;
use crate::postgres::{self, SqlValue};
use reconcile_core::RowSet;
use serde::Serialize;
use tokio_postgres::types::ToSql;

/// The three plan branch kinds, applied in this order within one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batched statement for one branch of one entity.
///
/// `sql` carries a `{values}` marker; `columns` is the positional parameter
/// order every bound row must match.
#[derive(Debug, Clone)]
pub struct StatementTemplate {
    pub operation: Operation,
    pub columns: &'static [&'static str],
    pub sql: &'static str,
}

/// Result of one applied branch: the RETURNING rows feeding the audit
/// report and the affected-row count.
#[derive(Debug)]
pub struct Applied {
    pub operation: Operation,
    pub affected: u64,
    pub rows: RowSet,
}

impl Applied {
    fn empty(operation: Operation) -> Self {
        Applied {
            operation,
            affected: 0,
            rows: RowSet::new(Vec::new()),
        }
    }
}

/// Expand the `{values}` marker into `rows` placeholder groups of `columns`
/// parameters each: `($1, $2), ($3, $4), …`.
pub fn expand_values(sql: &str, columns: usize, rows: usize) -> String {
    let mut groups = Vec::with_capacity(rows);
    let mut next = 1;
    for _ in 0..rows {
        let placeholders: Vec<String> = (0..columns)
            .map(|_| {
                let p = format!("${next}");
                next += 1;
                p
            })
            .collect();
        groups.push(format!("({})", placeholders.join(", ")));
    }
    sql.replace("{values}", &groups.join(", "))
}

/// Apply one plan branch as a single batched statement.
///
/// A branch with zero rows is a no-op and short-circuits before acquiring a
/// connection. On any execution error the transaction rolls back in full
/// and the error is returned to the caller, which decides whether the run
/// continues; the connection returns to the pool either way.
pub async fn apply_branch(
    pool: &TargetPool,
    entity: &str,
    template: &StatementTemplate,
    branch: &RowSet,
) -> Result<Applied, SyncError> {
    if branch.is_empty() {
        return Ok(Applied::empty(template.operation));
    }
    debug_assert_eq!(branch.columns.len(), template.columns.len());

    let sql = expand_values(template.sql, template.columns.len(), branch.len());
    let bound: Vec<SqlValue> = branch
        .rows
        .iter()
        .flat_map(|row| row.iter().map(SqlValue))
        .collect();
    let params: Vec<&(dyn ToSql + Sync)> = bound
        .iter()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect();

    let mut client = pool.acquire().await?;
    let tx = client.transaction().await?;

    let result = match tx.prepare(&sql).await {
        Ok(statement) => match tx.query(&statement, &params).await {
            Ok(rows) => Ok((statement, rows)),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok((statement, rows)) => {
            tx.commit().await?;
            tracing::info!(
                "{entity}: the db was updated with {} {} records",
                branch.len(),
                template.operation
            );
            let returned = postgres::rows_to_rowset(entity, statement.columns(), &rows)?;
            Ok(Applied {
                operation: template.operation,
                affected: returned.len() as u64,
                rows: returned,
            })
        }
        Err(e) => {
            tracing::error!(
                "an error occurred applying {} {}: {e}",
                entity,
                template.operation
            );
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("rollback failed for {entity}: {rollback_err}");
            }
            Err(e.into())
        }
    }
}
