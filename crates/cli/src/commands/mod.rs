//! `bh-cli` subcommands.

pub mod classify;
pub mod import;
pub mod migrate;
pub mod purge;
pub mod sync;

use brickhaus_storefront::bricklink::{BrickLinkError, InventoryItem};
use brickhaus_storefront::config::{self, ConfigError};
use brickhaus_storefront::db::{self, RepositoryError};
use brickhaus_storefront::models::NewProduct;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or invalid environment.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository query failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// BrickLink request failed.
    #[error("BrickLink error: {0}")]
    BrickLink(#[from] BrickLinkError),

    /// Reading an input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Connect to the catalog database.
async fn connect() -> Result<PgPool, CliError> {
    let database_url = config::database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Map listable inventory lots onto catalog rows.
///
/// Stockroom lots are skipped silently; lots that cannot be mapped are
/// logged and counted.
fn to_products(items: &[InventoryItem]) -> (Vec<NewProduct>, usize) {
    let mut products = Vec::with_capacity(items.len());
    let mut rejected = 0;

    for item in items.iter().filter(|item| item.is_listable()) {
        match item.to_new_product() {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping inventory lot");
                rejected += 1;
            }
        }
    }

    (products, rejected)
}
