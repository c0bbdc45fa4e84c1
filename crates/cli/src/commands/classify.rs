//! Theme and series classification commands.

use brickhaus_core::theme;
use brickhaus_storefront::db::ProductRepository;

use super::{CliError, connect};

/// Recompute theme and series for every product.
///
/// Run after changing the classifier tables.
///
/// # Errors
///
/// Returns `CliError` if the database cannot be read or written.
pub async fn reclassify() -> Result<(), CliError> {
    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let rows = repo.classification_inputs().await?;
    tracing::info!(count = rows.len(), "Reclassifying products...");

    let mut changed = 0_usize;
    for (id, name, item_no) in &rows {
        let classification = theme::classify(name, item_no);
        if repo
            .set_classification(*id, classification.theme, classification.series)
            .await?
        {
            tracing::debug!(inventory_id = %id, theme = classification.theme, "Reclassified");
            changed += 1;
        }
    }

    tracing::info!(changed, unchanged = rows.len() - changed, "Reclassify complete!");
    Ok(())
}

/// Print what the classifier makes of a name and item number.
pub fn classify(name: &str, item_no: &str) {
    let classification = theme::classify(name, item_no);

    #[allow(clippy::print_stdout)]
    {
        println!("Theme:  {} ({:?})", classification.theme, classification.source);
        match classification.series {
            Some(series) => println!("Series: {series}"),
            None => println!("Series: -"),
        }
    }
}
