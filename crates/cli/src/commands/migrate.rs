//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bh-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BRICKHAUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/storefront/migrations/`, embedded at compile time.

use brickhaus_storefront::db;

use super::{CliError, connect};

/// Run every pending migration.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
