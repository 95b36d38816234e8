//! Core reconciliation types for mineral-sync.
//!
//! This crate provides the pure diff engine used across the sync runner,
//! including:
//!
//! - [`Value`] - Scalar universe for snapshot cells
//! - [`Snapshot`] - Immutable rectangular extract of one entity from one store
//! - [`EntitySpec`] - Per-entity key/tracked-column configuration
//! - [`Plan`] / [`RowSet`] - The insert/update/delete partition of a diff
//! - [`reconcile`] - The full-outer-join diff itself
//!
//! # Architecture
//!
//! reconcile-core sits at the foundation of the sync runner:
//!
//! ```text
//! reconcile-core (this crate)
//!    │
//!    └─── mineral-sync  (fetches snapshots, applies plans, writes reports)
//! ```
//!
//! The crate has no I/O: [`reconcile`] is a deterministic function of two
//! snapshots and an entity spec, which is what makes the sync runner's
//! per-entity behavior testable without a database.
//!
//! # Example
//!
//! ```rust
//! use reconcile_core::{reconcile, EntitySpec, Snapshot, Value};
//!
//! let target = Snapshot::new(
//!     "mineral_log",
//!     vec!["name".into(), "mindat_id".into()],
//!     vec![vec![Value::Text("Quartz".into()), Value::Null]],
//! );
//! let source = Snapshot::new(
//!     "minerals",
//!     vec!["name".into(), "mindat_id".into()],
//!     vec![
//!         vec![Value::Text("Quartz".into()), Value::Int(101)],
//!         vec![Value::Text("Opal".into()), Value::Int(205)],
//!     ],
//! );
//!
//! let spec = EntitySpec {
//!     entity: "mineral_log".into(),
//!     key_columns: vec!["name".into()],
//!     tracked_columns: vec!["mindat_id".into()],
//!     insert_columns: vec!["name".into(), "mindat_id".into()],
//!     update_columns: vec!["name".into(), "mindat_id".into()],
//!     delete_columns: vec![],
//!     source_authoritative: false,
//!     source_required_any: vec![],
//! };
//!
//! let plan = reconcile(&target, &source, &spec).unwrap();
//! assert_eq!(plan.to_insert.rows.len(), 1);
//! assert_eq!(plan.to_update.rows.len(), 1);
//! ```

pub mod diff;
pub mod plan;
pub mod snapshot;
pub mod spec;
pub mod value;

// Re-exports for convenience
pub use diff::{reconcile, ReconcileError, Store};
pub use plan::{Plan, RowSet};
pub use snapshot::Snapshot;
pub use spec::EntitySpec;
pub use value::Value;
