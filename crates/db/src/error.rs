use thiserror::Error;

/// Prefix of the message a maintenance trigger raises when a table refuses writes.
pub(crate) const UNAVAILABLE_PREFIX: &str = "unavailable: ";

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection or lock could be obtained within the operation timeout.
    #[error("store operation timed out")]
    Timeout,

    /// Writes to the table are currently refused.
    #[error("table '{table}' is unavailable")]
    Unavailable { table: String },

    /// An insert or update would break a unique index.
    #[error("duplicate value for unique column {column}")]
    DuplicateKey { column: String },

    #[error("invalid database configuration: {0}")]
    Config(String),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl StoreError {
    /// Transient errors leave the store untouched and may be retried by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable { .. })
    }
}

/// SQLite result codes whose low byte marks a busy or locked database.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();

                if let Some(table) = message.strip_prefix(UNAVAILABLE_PREFIX) {
                    return StoreError::Unavailable {
                        table: table.to_string(),
                    };
                }

                if db_err.is_unique_violation() {
                    let column = message
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    return StoreError::DuplicateKey { column };
                }

                let busy = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED));
                if busy || message.contains("database is locked") {
                    return StoreError::Timeout;
                }

                StoreError::Query(sqlx::Error::Database(db_err))
            }
            other => StoreError::Query(other),
        }
    }
}
