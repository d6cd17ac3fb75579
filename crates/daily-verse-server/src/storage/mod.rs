//! Storage layer
//!
//! Two interchangeable Entity Store backends, picked once at startup:
//! SQLite (embedded, durable) and in-process maps (ephemeral).

pub mod db;
pub mod memory;

pub use db::Database;
pub use memory::MemoryStore;

use crate::settings::{ServerConfig, StorageBackend};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use verse_core::EntityStore;

/// Open the backend named by the configuration.
pub async fn open(config: &ServerConfig) -> Result<Arc<dyn EntityStore>> {
    match config.storage_backend {
        StorageBackend::Sqlite => {
            let db = Database::new(&config.database_path)
                .await
                .context("Failed to initialize database")?;
            info!("SQLite database initialized at: {}", config.database_path);
            let store: Arc<dyn EntityStore> = Arc::new(db);
            spawn_session_pruner(store.clone(), config.session_prune_interval());
            Ok(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStore::new(config.session_prune_interval())))
        }
    }
}

/// Periodically delete expired login sessions from the durable store.
fn spawn_session_pruner(store: Arc<dyn EntityStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.prune_expired_sessions().await {
                Ok(0) => {}
                Ok(n) => info!("Pruned {} expired sessions", n),
                Err(e) => warn!("Session pruning failed: {}", e),
            }
        }
    });
}
