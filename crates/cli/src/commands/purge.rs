//! Product purge command.
//!
//! # Usage
//!
//! ```bash
//! # Delete sold-out listings
//! bh-cli purge --zero-stock
//!
//! # See how many minifig listings would go
//! bh-cli purge --type minifig --dry-run
//!
//! # Empty the catalog
//! bh-cli purge --all
//! ```

use brickhaus_core::ItemType;
use brickhaus_storefront::db::ProductRepository;
use brickhaus_storefront::db::products::PurgeFilter;

use super::{CliError, connect};

/// Delete the products matching the flags.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for an unknown type or an unfiltered
/// purge without `--all`.
pub async fn run(
    zero_stock: bool,
    item_type: Option<&str>,
    all: bool,
    dry_run: bool,
) -> Result<(), CliError> {
    let filter = build_filter(zero_stock, item_type, all)?;

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    if dry_run {
        let count = repo.count_purgeable(&filter).await?;
        tracing::info!(would_delete = count, "Dry run, nothing deleted");
        return Ok(());
    }

    let deleted = repo.purge(&filter).await?;
    tracing::info!(deleted, "Purge complete!");
    Ok(())
}

fn build_filter(
    zero_stock: bool,
    item_type: Option<&str>,
    all: bool,
) -> Result<PurgeFilter, CliError> {
    let item_type = item_type
        .map(str::parse::<ItemType>)
        .transpose()
        .map_err(CliError::InvalidArgument)?;

    if !zero_stock && item_type.is_none() && !all {
        return Err(CliError::InvalidArgument(
            "no filter given; pass --zero-stock, --type or --all".to_string(),
        ));
    }

    Ok(PurgeFilter {
        zero_stock,
        item_type,
        keep: None,
    })
}
