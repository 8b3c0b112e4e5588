//! Database migration runner.

use tracing::info;

use crudkit_core::error::{AppError, ErrorKind};
use crudkit_core::result::AppResult;

use crate::connection::DatabasePool;

/// Run all pending database migrations from the workspace `migrations/`
/// directory.
pub async fn run_migrations(db: &DatabasePool) -> AppResult<()> {
    let migrator = sqlx::migrate!("../../migrations");
    info!(
        known = migrator.migrations.len(),
        "Running database migrations..."
    );

    migrator.run(db.pool()).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run migrations: {e}"),
            e,
        )
    })?;

    info!("Database migrations completed successfully");
    Ok(())
}
