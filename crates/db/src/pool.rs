//! Connection pool setup for the SQLite store.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{migrations, StoreError, UnitOfWork};

/// Database configuration.
///
/// ```rust,ignore
/// let config = DbConfig::new("sqlite://vidly.db")
///     .max_connections(5)
///     .operation_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `sqlite://` url of the database file. Created when missing.
    pub url: String,

    /// Default: 5
    pub max_connections: u32,

    /// Upper bound on waiting for a pooled connection or for the write lock.
    /// Default: 5 seconds
    pub operation_timeout: Duration,

    /// Apply pending migrations on connect. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            operation_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

/// Handle to the open database. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    operation_timeout: Duration,
    #[cfg(feature = "test-support")]
    scratch: Option<std::sync::Arc<test_support::Scratch>>,
}

impl Database {
    /// Open the pool and, unless disabled, apply pending migrations.
    ///
    /// The database runs in WAL mode so readers never wait on the writer. Writers queue on
    /// SQLite's lock for at most `operation_timeout`.
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        info!(target: "vidly-db", url = %config.url, "opening database");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Config(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.operation_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.operation_timeout)
            .connect_with(options)
            .await?;

        debug!(
            target: "vidly-db",
            max_connections = config.max_connections,
            operation_timeout = ?config.operation_timeout,
            "pool created"
        );

        let db = Self {
            pool,
            operation_timeout: config.operation_timeout,
            #[cfg(feature = "test-support")]
            scratch: None,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Apply every embedded migration that has not run yet.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!(target: "vidly-db", "running migrations");
        migrations::run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Start a transaction for writes that must commit together.
    pub async fn unit_of_work(&self) -> Result<UnitOfWork, StoreError> {
        UnitOfWork::begin(&self.pool).await
    }

    /// Whether the database still answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!(target: "vidly-db", "closing database pool");
        self.pool.close().await;
    }
}

#[cfg(feature = "test-support")]
mod test_support {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{Database, DbConfig};
    use crate::error::UNAVAILABLE_PREFIX;
    use crate::StoreError;

    /// Scratch directory holding a test database, removed with the last handle.
    #[derive(Debug)]
    pub(super) struct Scratch {
        _dir: TempDir,
        blocked: Mutex<BTreeSet<String>>,
    }

    const WRITE_EVENTS: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];

    fn trigger_name(table: &str, event: &str) -> String {
        format!("{table}_{}_unavailable", event.to_ascii_lowercase())
    }

    impl Database {
        /// A migrated database in a fresh temporary directory.
        pub async fn temporary(operation_timeout: Duration) -> Result<Self, StoreError> {
            let dir = tempfile::tempdir().map_err(|e| StoreError::Config(e.to_string()))?;
            let url = format!("sqlite://{}", dir.path().join("vidly.db").display());

            let mut db =
                Self::connect(&DbConfig::new(url).operation_timeout(operation_timeout)).await?;
            db.scratch = Some(Arc::new(Scratch {
                _dir: dir,
                blocked: Mutex::new(BTreeSet::new()),
            }));
            Ok(db)
        }

        /// Make every write to `table` fail until [`Database::restore_writes`] is called.
        pub async fn fail_writes_to(&self, table: &str) -> Result<(), StoreError> {
            if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(StoreError::Config(format!("invalid table name '{table}'")));
            }

            for event in WRITE_EVENTS {
                let sql = format!(
                    "CREATE TRIGGER IF NOT EXISTS {name} BEFORE {event} ON {table} \
                     BEGIN SELECT RAISE(ABORT, '{UNAVAILABLE_PREFIX}{table}'); END",
                    name = trigger_name(table, event),
                );
                sqlx::query(&sql).execute(&self.pool).await?;
            }

            if let Some(scratch) = &self.scratch {
                if let Ok(mut blocked) = scratch.blocked.lock() {
                    blocked.insert(table.to_string());
                }
            }
            Ok(())
        }

        /// Drop every trigger installed by [`Database::fail_writes_to`].
        pub async fn restore_writes(&self) -> Result<(), StoreError> {
            let tables: Vec<String> = match &self.scratch {
                Some(scratch) => match scratch.blocked.lock() {
                    Ok(mut blocked) => std::mem::take(&mut *blocked).into_iter().collect(),
                    Err(_) => Vec::new(),
                },
                None => Vec::new(),
            };

            for table in tables {
                for event in WRITE_EVENTS {
                    let sql = format!("DROP TRIGGER IF EXISTS {}", trigger_name(&table, event));
                    sqlx::query(&sql).execute(&self.pool).await?;
                }
            }
            Ok(())
        }

        /// Hold the write lock for `duration`. Resolves once the lock is held.
        pub async fn stall(&self, duration: Duration) {
            let pool = self.pool.clone();
            let (held_tx, held_rx) = tokio::sync::oneshot::channel();

            tokio::spawn(async move {
                let Ok(mut conn) = pool.acquire().await else {
                    return;
                };
                if sqlx::query("BEGIN IMMEDIATE")
                    .execute(&mut *conn)
                    .await
                    .is_err()
                {
                    return;
                }
                let _ = held_tx.send(());
                tokio::time::sleep(duration).await;
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            });

            let _ = held_rx.await;
        }
    }
}
