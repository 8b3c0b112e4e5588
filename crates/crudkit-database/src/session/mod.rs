//! Storage backends implementing the session traits of `crudkit-core`.

pub mod memory;
pub mod postgres;
mod sql;

use std::sync::Arc;

use tracing::info;

use crudkit_core::config::{DatabaseConfig, StorageBackend};
use crudkit_core::result::AppResult;
use crudkit_core::traits::SessionFactory;

pub use memory::{MemorySession, MemoryStore};
pub use postgres::{PgSession, PgStore};

use crate::connection::DatabasePool;
use crate::migration::run_migrations;

/// Build the session factory selected by configuration.
///
/// For PostgreSQL this connects the pool and, when enabled, applies
/// pending migrations.
pub async fn open_store(config: &DatabaseConfig) -> AppResult<Arc<dyn SessionFactory>> {
    match config.backend {
        StorageBackend::Postgres => {
            let db = DatabasePool::connect(config).await?;
            if config.run_migrations {
                run_migrations(&db).await?;
            }
            Ok(Arc::new(PgStore::new(db)))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
