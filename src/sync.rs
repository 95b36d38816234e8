//! Full reconciliation runs.
//!
//! A run is one pass over the entity catalog: fetch the source snapshots,
//! fetch every target table in parallel, then reconcile and apply each
//! entity sequentially. Per-entity and per-branch failures are contained:
//! they land in the [`SyncSummary`] and the run moves on. The only fatal
//! condition is failing to create the pool in the first place, which
//! happens before this module is reached.

use crate::audit::AuditReporter;
use crate::entities::{EntitySync, SourceKind};
use crate::executor::{self, StatementTemplate};
use crate::fetch::{self, SnapshotSet, TableFetch};
use crate::normalize;
use crate::pool::TargetPool;
use crate::queries;
use crate::source::SnapshotSource;
use chrono::Utc;
use reconcile_core::{reconcile, RowSet, Snapshot};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SyncOpts {
    /// Compute and log plans without touching the target store.
    pub dry_run: bool,
    /// Concurrent target-table fetches.
    pub fetch_workers: usize,
}

impl Default for SyncOpts {
    fn default() -> Self {
        SyncOpts {
            dry_run: false,
            fetch_workers: 4,
        }
    }
}

/// Named snapshots for one run, passed explicitly to every entity sync.
///
/// Each run owns its own context; nothing is accumulated across runs, so
/// two runs (or two tests) never observe each other's state.
pub struct SyncContext {
    pub target: SnapshotSet,
    pub minerals: Option<Snapshot>,
    pub relations: Option<Snapshot>,
}

impl SyncContext {
    /// The prepared source snapshot an entity reconciles against, derived
    /// on demand for the minerals-based projections.
    pub fn source_snapshot(&self, kind: SourceKind) -> Option<Snapshot> {
        match kind {
            SourceKind::Minerals => self.minerals.clone(),
            SourceKind::MineralsFormula => {
                self.minerals.as_ref().map(normalize::prepare_minerals_formula)
            }
            SourceKind::MineralsContext => {
                self.minerals.as_ref().map(normalize::prepare_mineral_contexts)
            }
            SourceKind::Relations => self.relations.clone(),
        }
    }
}

/// What happened to one entity during a run.
#[derive(Debug, Default, serde::Serialize)]
pub struct SyncOutcome {
    pub entity: String,
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    /// Branches that failed, with the error they failed with.
    pub failures: Vec<(executor::Operation, String)>,
    /// Set when the entity never reached the apply stage.
    pub skipped: Option<String>,
}

impl SyncOutcome {
    fn new(entity: &str) -> Self {
        SyncOutcome {
            entity: entity.to_string(),
            ..Default::default()
        }
    }
}

/// Per-entity outcomes for one full run.
#[derive(Debug, Default, serde::Serialize)]
pub struct SyncSummary {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncSummary {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.failures.is_empty())
    }
}

/// Run a full reconciliation pass over the given entities.
pub async fn run_full_sync(
    pool: &Arc<TargetPool>,
    source: &dyn SnapshotSource,
    reporter: &AuditReporter,
    opts: &SyncOpts,
    entities: &[EntitySync],
) -> anyhow::Result<SyncSummary> {
    tracing::info!("starting full sync of {} entities", entities.len());

    let ctx = build_context(pool, source, opts, entities).await;

    let mut summary = SyncSummary::default();
    for entity in entities {
        summary
            .outcomes
            .push(sync_entity(pool, reporter, opts, &ctx, entity).await);
    }

    tracing::info!("full sync completed");
    Ok(summary)
}

/// Fetch the source snapshots, then every target table in parallel.
async fn build_context(
    pool: &Arc<TargetPool>,
    source: &dyn SnapshotSource,
    opts: &SyncOpts,
    entities: &[EntitySync],
) -> SyncContext {
    let minerals = match source.fetch("minerals", queries::GET_MINERALS).await {
        Ok(snapshot) => Some(normalize::prepare_minerals(&snapshot.sorted_by("name"))),
        Err(e) => {
            tracing::error!("an error occurred when fetching minerals: {e}");
            None
        }
    };

    let relations = if entities.iter().any(|e| e.source == SourceKind::Relations) {
        match source.fetch("relations", queries::GET_RELATIONS).await {
            Ok(snapshot) => Some(snapshot.sorted_by("id")),
            Err(e) => {
                tracing::error!("an error occurred when fetching relations: {e}");
                None
            }
        }
    } else {
        None
    };

    let fetches: Vec<TableFetch> = entities
        .iter()
        .map(|e| TableFetch {
            entity: e.spec.entity.clone(),
            query: e.target_query,
        })
        .collect();
    let target = fetch::fetch_tables(Arc::clone(pool), fetches, opts.fetch_workers).await;

    SyncContext {
        target,
        minerals,
        relations,
    }
}

/// Reconcile and apply one entity. Never returns an error: everything that
/// can go wrong here is contained to this entity's outcome.
async fn sync_entity(
    pool: &Arc<TargetPool>,
    reporter: &AuditReporter,
    opts: &SyncOpts,
    ctx: &SyncContext,
    entity: &EntitySync,
) -> SyncOutcome {
    let name = &entity.spec.entity;
    let mut outcome = SyncOutcome::new(name);

    let Some(target) = ctx.target.get(name) else {
        tracing::warn!("skipping {name}: target snapshot unavailable");
        outcome.skipped = Some("target snapshot unavailable".into());
        return outcome;
    };
    let Some(source) = ctx.source_snapshot(entity.source) else {
        tracing::warn!("skipping {name}: source snapshot unavailable");
        outcome.skipped = Some("source snapshot unavailable".into());
        return outcome;
    };

    let plan = match reconcile(target, &source, &entity.spec) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!("skipping {name}: {e}");
            outcome.skipped = Some(e.to_string());
            return outcome;
        }
    };

    if plan.is_empty() {
        tracing::info!("{name} is up to date");
        return outcome;
    }

    if opts.dry_run {
        tracing::info!(
            "dry-run: would insert {}, update {}, delete {} {name} records",
            plan.to_insert.len(),
            plan.to_update.len(),
            plan.to_delete.as_ref().map_or(0, |d| d.len()),
        );
        outcome.inserted = plan.to_insert.len() as u64;
        outcome.updated = plan.to_update.len() as u64;
        outcome.deleted = plan.to_delete.as_ref().map_or(0, |d| d.len()) as u64;
        return outcome;
    }

    // Branches apply sequentially; a failed branch does not roll back its
    // predecessors and does not stop the ones after it.
    match apply_and_report(pool, reporter, name, &entity.insert, &plan.to_insert).await {
        Ok(n) => outcome.inserted = n,
        Err(failure) => outcome.failures.push(failure),
    }

    if let Some(update) = &entity.update {
        match apply_and_report(pool, reporter, name, update, &plan.to_update).await {
            Ok(n) => outcome.updated = n,
            Err(failure) => outcome.failures.push(failure),
        }
    }

    if let (Some(delete), Some(to_delete)) = (&entity.delete, &plan.to_delete) {
        match apply_and_report(pool, reporter, name, delete, to_delete).await {
            Ok(n) => outcome.deleted = n,
            Err(failure) => outcome.failures.push(failure),
        }
    }

    outcome
}

/// Apply one branch and record the rows it returned. A failure comes back
/// as the operation/error pair recorded in the entity's outcome.
async fn apply_and_report(
    pool: &Arc<TargetPool>,
    reporter: &AuditReporter,
    entity: &str,
    template: &StatementTemplate,
    branch: &RowSet,
) -> Result<u64, (executor::Operation, String)> {
    match executor::apply_branch(pool, entity, template, branch).await {
        Ok(applied) => {
            if !applied.rows.is_empty() {
                if let Err(e) =
                    reporter.write(entity, template.operation, &applied.rows, Utc::now())
                {
                    tracing::error!("failed to write {entity} {} report: {e}", template.operation);
                }
            }
            Ok(applied.affected)
        }
        Err(e) => Err((template.operation, e.to_string())),
    }
}
