//! Vidly application library
//!
//! Entity modules for the rental store, the rental ledger, and the wiring that turns them
//! into a served application.

pub mod app;
pub mod context;
pub mod modules;
pub mod utils;

pub use app::Application;
pub use context::AppContext;
