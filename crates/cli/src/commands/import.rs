//! Bulk import of a BrickLink inventory export.
//!
//! # Usage
//!
//! ```bash
//! bh-cli import inventory.json
//! bh-cli import inventory.json --dry-run
//! ```
//!
//! The file is either a JSON array of inventory lots or a saved
//! `GET /inventories` response with its `meta`/`data` envelope. Lots go
//! through the same transform as `sync inventory`.

use std::path::Path;

use brickhaus_storefront::bricklink::parse_inventory_export;
use brickhaus_storefront::db::ProductRepository;

use super::{CliError, connect, to_products};

/// Import an export file into the catalog.
///
/// # Errors
///
/// Returns `CliError` if the file cannot be read or parsed, or the database
/// cannot be written.
pub async fn run(file: &Path, dry_run: bool) -> Result<(), CliError> {
    tracing::info!(file = %file.display(), "Reading inventory export...");
    let bytes = tokio::fs::read(file).await?;
    let items = parse_inventory_export(&bytes)?;

    let (products, rejected) = to_products(&items);
    tracing::info!(
        lots = items.len(),
        listable = products.len(),
        rejected,
        "Export transformed"
    );

    if dry_run {
        tracing::info!(would_upsert = products.len(), "Dry run, nothing written");
        return Ok(());
    }

    let pool = connect().await?;
    let written = ProductRepository::new(&pool).upsert_many(&products).await?;

    tracing::info!(written, "Import complete!");
    Ok(())
}
