//! Command-line interface for mineral-sync
//!
//! # Usage Examples
//!
//! ## Full Sync
//! ```bash
//! # Everything, with connection parameters from the environment
//! mineral-sync full
//!
//! # Explicit connections
//! mineral-sync full \
//!   --postgres-host localhost --postgres-db mr \
//!   --postgres-user mr --postgres-password secret \
//!   --mindat-user mindat --mindat-password secret --mindat-database mindat
//!
//! # A subset of entities, without writing anything
//! mineral-sync full --entity mineral_log --entity mineral_history --dry-run
//! ```
//!
//! Audit reports land in `db/reports/` (override with `--reports-dir`);
//! one CSV per applied insert/update/delete branch.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mineral_sync::audit::AuditReporter;
use mineral_sync::entities::{self, EntitySync};
use mineral_sync::pool::TargetPool;
use mineral_sync::source::MindatSource;
use mineral_sync::sync::{run_full_sync, SyncOpts};
use mineral_sync::{MindatOpts, TargetOpts};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mineral-sync")]
#[command(about = "Reconciles Mindat mineralogy data into the MR PostgreSQL database")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full reconciliation pass
    Full {
        /// Mindat source connection options
        #[command(flatten)]
        mindat: MindatOpts,

        /// MR target connection options
        #[command(flatten)]
        target: TargetOpts,

        /// Only sync the named entities (default: the whole catalog)
        #[arg(long = "entity", value_name = "NAME")]
        entities: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Full {
            mindat,
            target,
            entities,
        } => run_full(mindat, target, entities).await,
    }
}

async fn run_full(
    mindat: MindatOpts,
    target: TargetOpts,
    only: Vec<String>,
) -> anyhow::Result<()> {
    // An unreachable target at startup is the one unrecoverable condition
    let pool = TargetPool::connect(target.pg_config(), target.pool_size)
        .await
        .context("establishing a connection with the MR database")?;
    let pool = Arc::new(pool);

    let source = MindatSource::connect(&mindat.url())
        .context("configuring the Mindat connection")?;
    let reporter = AuditReporter::new(&target.reports_dir);

    let selected = select_entities(entities::catalog(), &only);
    if selected.is_empty() {
        anyhow::bail!("no known entities selected");
    }

    let opts = SyncOpts {
        dry_run: target.dry_run,
        fetch_workers: target.fetch_workers,
    };

    let summary = run_full_sync(&pool, &source, &reporter, &opts, &selected).await?;

    for outcome in &summary.outcomes {
        match &outcome.skipped {
            Some(reason) => tracing::warn!("{}: skipped ({reason})", outcome.entity),
            None => tracing::info!(
                "{}: {} inserted, {} updated, {} deleted",
                outcome.entity,
                outcome.inserted,
                outcome.updated,
                outcome.deleted
            ),
        }
        for (operation, error) in &outcome.failures {
            tracing::warn!("{}: {operation} branch failed: {error}", outcome.entity);
        }
    }

    tracing::debug!("run summary: {}", serde_json::to_string(&summary)?);

    pool.close();
    source.disconnect().await?;

    // Branch failures are contained per entity; the run itself succeeded.
    if summary.has_failures() {
        tracing::warn!("full sync finished with failed branches, see warnings above");
    }
    Ok(())
}

fn select_entities(catalog: Vec<EntitySync>, only: &[String]) -> Vec<EntitySync> {
    if only.is_empty() {
        return catalog;
    }
    for name in only {
        if !catalog.iter().any(|e| &e.spec.entity == name) {
            tracing::warn!("unknown entity {name} ignored");
        }
    }
    catalog
        .into_iter()
        .filter(|e| only.contains(&e.spec.entity))
        .collect()
}
