//! Result persistence
//!
//! Every job appends its results to a libsql database in one batch. The
//! rest of the service only sees the [`ResultSink`] trait.

pub mod repository;
pub mod migrations;
pub mod models;

pub use models::ResultRow;
pub use repository::{ResultSink, ResultStore};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
