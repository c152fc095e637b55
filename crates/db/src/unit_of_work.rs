//! Writes that commit together or not at all.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::StoreError;

/// An open transaction. Dropping it without [`UnitOfWork::commit`] rolls every write back.
#[must_use = "writes are rolled back unless committed"]
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool) -> Result<Self, StoreError> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// Connection to run the unit's statements on.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        debug!(target: "vidly-db", "unit of work committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        debug!(target: "vidly-db", "unit of work rolled back");
        Ok(())
    }
}
