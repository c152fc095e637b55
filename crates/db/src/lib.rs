//! SQLite store for vidly.
//!
//! [`Database`] owns the connection pool and applies the embedded migrations. Writes that
//! must commit together go through a [`UnitOfWork`].

pub mod error;
pub mod migrations;
pub mod object_id;
pub mod pool;
pub mod unit_of_work;

pub use error::StoreError;
pub use object_id::ObjectId;
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;
