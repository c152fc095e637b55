//! Schema migrations embedded from the workspace `migrations/` directory.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::info;

use crate::StoreError;

pub(crate) static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub(crate) async fn run(pool: &SqlitePool) -> Result<(), StoreError> {
    MIGRATOR.run(pool).await?;
    info!(target: "vidly-db", count = MIGRATOR.iter().count(), "migrations applied");
    Ok(())
}

/// Version and description of every embedded migration, oldest first.
pub fn list() -> Vec<(i64, String)> {
    MIGRATOR
        .iter()
        .map(|m| (m.version, m.description.to_string()))
        .collect()
}
