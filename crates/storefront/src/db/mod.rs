//! Database operations for the Brickhaus `PostgreSQL` database.
//!
//! ## Schemas
//!
//! - `catalog.product` - BrickLink inventory lots with their derived theme/series
//! - `catalog.minifig_details` - Minifigure catalog enrichment
//! - `sales.order`, `sales.order_line` - Orders and their line snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p brickhaus-cli -- migrate
//! ```
//!
//! Listing queries are assembled at runtime with `sqlx::QueryBuilder`, so
//! every repository uses the runtime-checked query functions.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod minifigs;
pub mod orders;
pub mod products;

pub use minifigs::MinifigRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost state race.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// `numeric_value_out_of_range`, raised when stock arithmetic overflows `INTEGER`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Map unique and check violations, and integer overflow, to
/// [`RepositoryError::Conflict`].
pub(crate) fn map_constraint(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation()
            || db_err.is_check_violation()
            || db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE))
    {
        return RepositoryError::Conflict(format!("{what}: {}", db_err.message()));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
