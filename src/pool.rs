//! Bounded connection pool for the target store.
//!
//! Every query and batch operation against the MR database goes through a
//! checkout/checkin pair: [`TargetPool::acquire`] waits for a pool permit
//! and hands out a [`PooledClient`] guard that returns the client on drop,
//! whatever exit path the caller takes.
//!
//! Pool creation establishes an initial connection eagerly; an unreachable
//! target at startup is the one unrecoverable condition in the whole runner
//! and propagates out of `main`.

use crate::error::SyncError;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_postgres::{Client, Config, NoTls};

pub struct TargetPool {
    config: Config,
    idle: Arc<Mutex<Vec<Client>>>,
    permits: Arc<Semaphore>,
}

impl TargetPool {
    /// Create a pool of at most `max_size` connections, verifying
    /// reachability with one eager connection.
    pub async fn connect(config: Config, max_size: usize) -> Result<Self, SyncError> {
        let pool = TargetPool {
            config,
            idle: Arc::new(Mutex::new(Vec::new())),
            permits: Arc::new(Semaphore::new(max_size)),
        };

        let client = pool.open().await?;
        pool.idle.lock().unwrap().push(client);
        tracing::info!("connection pool with the MR database created");

        Ok(pool)
    }

    async fn open(&self) -> Result<Client, SyncError> {
        let (client, connection) = self.config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("target connection task ended with error: {e}");
            }
        });
        Ok(client)
    }

    /// Check a connection out of the pool, waiting for a permit when all
    /// are in use. Further connections are opened lazily up to the pool
    /// bound; checked-in clients are reused first.
    pub async fn acquire(&self) -> Result<PooledClient, SyncError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SyncError::PoolExhausted)?;

        let reused = self.idle.lock().unwrap().pop();
        let client = match reused {
            Some(client) if !client.is_closed() => client,
            _ => self.open().await?,
        };

        Ok(PooledClient {
            client: Some(client),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    /// Close the permit gate and drop idle connections. Outstanding
    /// [`PooledClient`]s stay usable until dropped; subsequent `acquire`
    /// calls fail with [`SyncError::PoolExhausted`].
    pub fn close(&self) {
        tracing::info!("disconnecting from the MR database");
        self.permits.close();
        self.idle.lock().unwrap().clear();
    }
}

/// A checked-out connection. Derefs to [`tokio_postgres::Client`] and checks
/// itself back in on drop.
pub struct PooledClient {
    client: Option<Client>,
    idle: Arc<Mutex<Vec<Client>>>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client.as_ref().expect("client taken before drop")
    }
}

impl DerefMut for PooledClient {
    fn deref_mut(&mut self) -> &mut Client {
        self.client.as_mut().expect("client taken before drop")
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if !client.is_closed() {
                self.idle.lock().unwrap().push(client);
            }
        }
    }
}
