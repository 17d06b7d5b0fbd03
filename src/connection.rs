//! Lazily opened, self-healing graph store handle.
//!
//! Commands hold one [`GraphConnection`] and call
//! [`acquire`](GraphConnection::acquire) before each pipeline run. The handle
//! opens the backend on first use, verifies connectivity on every acquire and
//! reconnects at most `max_reconnects` times with a fixed backoff. When every
//! attempt fails the caller gets [`StoreError::Unavailable`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use delta_trace_core::store::{GraphStore, StoreError};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Opens a fresh backend connection.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self) -> anyhow::Result<Arc<dyn GraphStore>>;
}

/// Opens the SQLite graph database and makes sure its schema exists.
pub struct SqliteOpener {
    path: PathBuf,
}

impl SqliteOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StoreOpener for SqliteOpener {
    async fn open(&self) -> anyhow::Result<Arc<dyn GraphStore>> {
        let pool = db::connect_path(&self.path).await?;
        migrate::create_schema(&pool).await?;
        Ok(Arc::new(SqliteStore::new(pool)))
    }
}

pub struct GraphConnection {
    opener: Box<dyn StoreOpener>,
    current: Mutex<Option<Arc<dyn GraphStore>>>,
    max_reconnects: u32,
    backoff: Duration,
}

impl GraphConnection {
    pub fn new(opener: Box<dyn StoreOpener>, max_reconnects: u32, backoff: Duration) -> Self {
        Self {
            opener,
            current: Mutex::new(None),
            max_reconnects: max_reconnects.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(SqliteOpener::new(&config.db.path)),
            config.store.max_reconnects,
            Duration::from_millis(config.store.reconnect_backoff_ms),
        )
    }

    /// A live store, reconnecting if the current one fails its check.
    pub async fn acquire(&self) -> Result<Arc<dyn GraphStore>, StoreError> {
        let mut current = self.current.lock().await;
        if let Some(store) = current.as_ref() {
            if store.connectivity_check().await {
                return Ok(Arc::clone(store));
            }
            warn!("graph store failed connectivity check; reconnecting");
            *current = None;
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_reconnects {
            match self.opener.open().await {
                Ok(store) if store.connectivity_check().await => {
                    info!(attempt, "graph store connected");
                    *current = Some(Arc::clone(&store));
                    return Ok(store);
                }
                Ok(_) => last_error = "connectivity check failed".to_string(),
                Err(e) => last_error = format!("{e:#}"),
            }
            debug!(attempt, error = %last_error, "graph store connect attempt failed");
            if attempt < self.max_reconnects {
                tokio::time::sleep(self.backoff).await;
            }
        }

        Err(StoreError::Unavailable(format!(
            "gave up after {} attempt(s): {}",
            self.max_reconnects, last_error
        )))
    }
}
