//! BrickLink sync commands.
//!
//! # Usage
//!
//! ```bash
//! # Upsert every listable lot
//! bh-cli sync inventory
//!
//! # Minifigs only, deleting local minifigs no longer in the store
//! bh-cli sync inventory --minifigs-only --purge-missing
//!
//! # Fetch catalog details for up to 100 minifigs without any
//! bh-cli sync minifigs --limit 100
//! ```
//!
//! # Environment Variables
//!
//! - `BRICKHAUS_DATABASE_URL` - `PostgreSQL` connection string
//! - `BRICKLINK_CONSUMER_KEY`, `BRICKLINK_CONSUMER_SECRET`,
//!   `BRICKLINK_TOKEN_VALUE`, `BRICKLINK_TOKEN_SECRET` - Store API credentials

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use brickhaus_core::{InventoryId, ItemType};
use brickhaus_storefront::bricklink::{BrickLinkClient, BrickLinkError, InventoryQuery};
use brickhaus_storefront::config;
use brickhaus_storefront::db::products::PurgeFilter;
use brickhaus_storefront::db::{MinifigRepository, ProductRepository};

use super::{CliError, connect, to_products};

/// Retries after the first failed BrickLink call.
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Flags for `sync inventory`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryOptions {
    pub minifigs_only: bool,
    pub purge_missing: bool,
    pub dry_run: bool,
}

/// Fetch the store inventory and upsert it into the catalog.
///
/// # Errors
///
/// Returns `CliError` if credentials are missing, BrickLink fails, or the
/// database cannot be written.
pub async fn inventory(options: InventoryOptions) -> Result<(), CliError> {
    let client = BrickLinkClient::new(config::bricklink_credentials_from_env()?);

    let query = if options.minifigs_only {
        InventoryQuery::minifigs()
    } else {
        InventoryQuery::default()
    };

    tracing::info!(minifigs_only = options.minifigs_only, "Fetching BrickLink inventory...");
    let items = client.inventories(&query).await?;
    let (products, rejected) = to_products(&items);
    tracing::info!(
        lots = items.len(),
        listable = products.len(),
        rejected,
        "Inventory transformed"
    );

    if options.purge_missing && products.is_empty() {
        return Err(CliError::InvalidArgument(
            "BrickLink returned no listable lots; refusing to purge the catalog".to_string(),
        ));
    }

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let purge_filter = PurgeFilter {
        zero_stock: false,
        item_type: options.minifigs_only.then_some(ItemType::Minifig),
        keep: Some(products.iter().map(|p| p.inventory_id).collect::<Vec<InventoryId>>()),
    };

    if options.dry_run {
        let missing = if options.purge_missing {
            repo.count_purgeable(&purge_filter).await?
        } else {
            0
        };
        tracing::info!(
            would_upsert = products.len(),
            would_delete = missing,
            "Dry run, nothing written"
        );
        return Ok(());
    }

    let written = repo.upsert_many(&products).await?;
    tracing::info!(written, "Products upserted");

    if options.purge_missing {
        let deleted = repo.purge(&purge_filter).await?;
        tracing::info!(deleted, "Products missing from BrickLink deleted");
    }

    Ok(())
}

/// Fetch catalog details (and category names) for minifigs.
///
/// A figure that still fails after retries is logged and skipped.
///
/// # Errors
///
/// Returns `CliError` if credentials are missing or the database fails.
pub async fn minifigs(limit: Option<i64>, refresh: bool) -> Result<(), CliError> {
    if limit.is_some_and(|l| l <= 0) {
        return Err(CliError::InvalidArgument("--limit must be positive".to_string()));
    }

    let client = BrickLinkClient::new(config::bricklink_credentials_from_env()?);
    let pool = connect().await?;
    let repo = MinifigRepository::new(&pool);

    let item_nos = repo.item_numbers_to_enrich(refresh, limit).await?;
    tracing::info!(count = item_nos.len(), refresh, "Enriching minifigs...");

    let mut categories: HashMap<i32, Option<String>> = HashMap::new();
    let mut enriched = 0_usize;
    let mut failed = 0_usize;

    for item_no in &item_nos {
        let fetched = with_retry(RETRY_BACKOFF, || {
            client.catalog_item(ItemType::Minifig, item_no)
        })
        .await;
        let item = match fetched {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(%item_no, error = %e, "Failed to fetch catalog item");
                failed += 1;
                continue;
            }
        };

        let category_name = match item.category_id {
            Some(id) => {
                if let Some(name) = categories.get(&id) {
                    name.clone()
                } else {
                    let name = match with_retry(RETRY_BACKOFF, || client.category(id)).await {
                        Ok(category) => Some(category.category_name),
                        Err(e) => {
                            tracing::warn!(category_id = id, error = %e, "Failed to fetch category");
                            None
                        }
                    };
                    categories.insert(id, name.clone());
                    name
                }
            }
            None => None,
        };

        repo.upsert(&item.to_minifig_details(category_name)).await?;
        enriched += 1;
    }

    tracing::info!(
        enriched,
        failed,
        categories = categories.len(),
        "Minifig enrichment complete"
    );
    Ok(())
}

/// Run a BrickLink call, retrying transient failures with a fixed backoff.
async fn with_retry<T, F, Fut>(backoff: Duration, mut call: F) -> Result<T, BrickLinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BrickLinkError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::debug!(attempt, error = %e, "Retrying BrickLink call");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn api_error(code: u16) -> BrickLinkError {
        BrickLinkError::Api {
            code,
            message: String::new(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(503)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(Duration::ZERO, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n == 0 { Err(api_error(429)) } else { Ok(n) } }
        })
        .await;

        assert!(matches!(result, Ok(1)));
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(404)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
