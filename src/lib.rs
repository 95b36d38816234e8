//! mineral-sync Library
//!
//! A library for reconciling mineralogy reference data from the Mindat MySQL
//! database into the MR PostgreSQL database.
//!
//! # Features
//!
//! - Key-based reconciliation: per-entity outer-join diff computing the
//!   minimal insert/update/delete set
//! - Parallel snapshot fetch: one pooled connection per target table,
//!   per-table failure isolation
//! - Batched application: one statement round-trip per plan branch, rolled
//!   back as a unit on failure
//! - Audit reports: a timestamped CSV per applied branch
//!
//! # Synchronized entities
//!
//! - `mineral_log` - the mineral list itself (descriptions, Mindat ids, IMA symbols)
//! - `mineral_history` - discovery/IMA/approval/publication years
//! - `mineral_formula` - display and IMA formulas, keyed by `(name, source_id)`
//! - `mineral_crystallography` - crystal systems
//! - `mineral_relation_suggestion` - Mindat relation pairs; the source is
//!   authoritative, so orphaned suggestions are deleted
//! - `mineral_context` - physical/optical property blobs
//!
//! # CLI Usage
//!
//! ```bash
//! # Full reconciliation pass
//! mineral-sync full --postgres-db mr --postgres-user mr --mindat-database mindat
//!
//! # Dry run of two entities against a non-default target
//! mineral-sync full --entity mineral_log --entity mineral_history \
//!   --postgres-host db.internal --dry-run
//! ```
//!
//! Connection parameters default from the same environment variables the
//! deployment has always used (`POSTGRES_*`, `MYSQL_*`).

use clap::Parser;
use std::path::PathBuf;

pub mod audit;
pub mod entities;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod normalize;
pub mod pool;
pub mod postgres;
pub mod queries;
pub mod source;
pub mod sync;
pub mod testing;

pub use error::SyncError;

// Re-export the diff engine for convenience
pub use reconcile_core::{reconcile, EntitySpec, Plan, RowSet, Snapshot, Value};

#[derive(Parser, Clone)]
pub struct TargetOpts {
    /// MR PostgreSQL host
    #[arg(long, default_value = "localhost", env = "POSTGRES_HOST")]
    pub postgres_host: String,

    /// MR PostgreSQL port
    #[arg(long, default_value = "5432", env = "POSTGRES_PORT")]
    pub postgres_port: u16,

    /// MR PostgreSQL database name
    #[arg(long, env = "POSTGRES_DB")]
    pub postgres_db: String,

    /// MR PostgreSQL user
    #[arg(long, env = "POSTGRES_USER")]
    pub postgres_user: String,

    /// MR PostgreSQL password
    #[arg(long, env = "POSTGRES_PASSWORD")]
    pub postgres_password: String,

    /// Maximum pooled connections to the target store
    #[arg(long, default_value = "50")]
    pub pool_size: usize,

    /// Concurrent target-table fetches (independent of the pool size)
    #[arg(long, default_value = "4")]
    pub fetch_workers: usize,

    /// Directory receiving audit report files
    #[arg(long, default_value = "db/reports")]
    pub reports_dir: PathBuf,

    /// Dry run mode - compute plans but don't write anything
    #[arg(long)]
    pub dry_run: bool,
}

impl TargetOpts {
    /// tokio-postgres connection configuration for the target store.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.postgres_host)
            .port(self.postgres_port)
            .dbname(&self.postgres_db)
            .user(&self.postgres_user)
            .password(&self.postgres_password);
        config
    }
}

#[derive(Parser, Clone)]
pub struct MindatOpts {
    /// Mindat MySQL host
    #[arg(long, default_value = "127.0.0.1", env = "MYSQL_HOST")]
    pub mindat_host: String,

    /// Mindat MySQL user
    #[arg(long, env = "MYSQL_USER")]
    pub mindat_user: String,

    /// Mindat MySQL password
    #[arg(long, env = "MYSQL_PASSWORD")]
    pub mindat_password: String,

    /// Mindat MySQL database name
    #[arg(long, env = "MYSQL_DATABASE")]
    pub mindat_database: String,
}

impl MindatOpts {
    /// mysql_async connection URL for the Mindat replica.
    pub fn url(&self) -> String {
        format!(
            "mysql://{}:{}@{}/{}",
            self.mindat_user, self.mindat_password, self.mindat_host, self.mindat_database
        )
    }
}
