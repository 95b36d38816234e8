//! Typed error taxonomy for the sync runner.
//!
//! Failure scopes, from widest to narrowest:
//!
//! - pool creation failure is fatal and propagates out of `main`;
//! - a fetch failure is contained to its entity (the snapshot is simply
//!   unavailable and dependent syncs are skipped);
//! - a batch-apply failure rolls back its own branch and is surfaced to the
//!   driver, which records it and continues.
//!
//! No component retries; every failure is terminal for its unit of work
//! within the current run.

use reconcile_core::ReconcileError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The pool permit gate is closed; no connection can ever be granted.
    #[error("target connection pool exhausted")]
    PoolExhausted,

    /// A sync depends on a snapshot that failed to fetch this run.
    #[error("no snapshot available for entity {entity}")]
    SnapshotUnavailable { entity: String },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("target store error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("entity {entity}: unsupported column type {ty} for column {column}")]
    UnsupportedColumn {
        entity: String,
        column: String,
        ty: String,
    },

    #[error("source store error: {0}")]
    Source(#[from] mysql_async::Error),

    #[error("audit report error: {0}")]
    Report(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
