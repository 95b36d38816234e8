//! Parallel snapshot fetch for the target store.
//!
//! One read query per entity table, each dispatched as its own task through
//! its own pooled connection. A failing table is logged and recorded as
//! unavailable; sibling fetches proceed unaffected. The pass completes only
//! once every dispatched fetch has finished or failed - there is no
//! per-fetch timeout, so a hung query holds its slot for the whole run.

use crate::error::SyncError;
use crate::pool::TargetPool;
use crate::postgres;
use reconcile_core::Snapshot;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One target table to snapshot.
#[derive(Debug, Clone)]
pub struct TableFetch {
    pub entity: String,
    pub query: &'static str,
}

/// The named snapshots produced by one fetch pass. Entities whose fetch
/// failed are simply absent.
#[derive(Debug, Default)]
pub struct SnapshotSet {
    snapshots: HashMap<String, Snapshot>,
}

impl SnapshotSet {
    pub fn get(&self, entity: &str) -> Option<&Snapshot> {
        self.snapshots.get(entity)
    }

    pub fn insert(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.entity().to_string(), snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Fetch every listed table concurrently, at most `workers` at a time.
///
/// The worker bound is independent of the pool size; when workers exceed
/// free connections the surplus fetches block in `acquire`.
pub async fn fetch_tables(
    pool: Arc<TargetPool>,
    fetches: Vec<TableFetch>,
    workers: usize,
) -> SnapshotSet {
    let started = std::time::Instant::now();
    let gate = Arc::new(Semaphore::new(workers.max(1)));

    let mut handles = Vec::with_capacity(fetches.len());
    for fetch in fetches {
        let pool = Arc::clone(&pool);
        let gate = Arc::clone(&gate);
        handles.push(tokio::spawn(async move {
            let _slot = gate.acquire_owned().await.expect("fetch gate closed");
            match fetch_one(&pool, &fetch).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::error!("an error occurred when fetching {}: {e}", fetch.entity);
                    None
                }
            }
        }));
    }

    let mut set = SnapshotSet::default();
    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok(Some(snapshot)) => {
                tracing::debug!(
                    "fetched {} rows for {}",
                    snapshot.len(),
                    snapshot.entity()
                );
                set.insert(snapshot);
            }
            Ok(None) => {}
            Err(e) => tracing::error!("fetch task failed: {e}"),
        }
    }

    tracing::info!(
        "target tables fetched in {:.2} seconds",
        started.elapsed().as_secs_f64()
    );
    set
}

async fn fetch_one(pool: &TargetPool, fetch: &TableFetch) -> Result<Snapshot, SyncError> {
    let client = pool.acquire().await?;
    let statement = client.prepare(fetch.query).await?;
    let rows = client.query(&statement, &[]).await?;
    postgres::rows_to_snapshot(&fetch.entity, statement.columns(), &rows)
}
