//! Brickhaus CLI - BrickLink sync, catalog import and database maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bh-cli migrate
//!
//! # Pull the store inventory from BrickLink
//! bh-cli sync inventory --purge-missing
//!
//! # Fetch catalog details for minifigs that have none yet
//! bh-cli sync minifigs --limit 200
//!
//! # Import a BrickLink inventory export
//! bh-cli import inventory.json
//!
//! # Delete sold-out minifig listings
//! bh-cli purge --zero-stock --type minifig
//!
//! # Recompute theme and series for every product
//! bh-cli reclassify
//!
//! # Try the classifier
//! bh-cli classify "Clone Trooper, Phase 2" --item-no sw0187
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sync inventory` / `sync minifigs` - BrickLink Store API sync
//! - `import` - Bulk import a BrickLink inventory JSON export
//! - `purge` - Delete products
//! - `reclassify` / `classify` - Theme and series classification

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bh-cli")]
#[command(author, version, about = "Brickhaus CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Sync from the BrickLink Store API
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
    /// Import a BrickLink inventory JSON export
    Import {
        /// Path to the export (array of lots or the full API envelope)
        file: PathBuf,

        /// Parse and report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete products
    Purge {
        /// Only products with no stock left
        #[arg(long)]
        zero_stock: bool,

        /// Only products of this type (e.g. `minifig`, `M`, `set`)
        #[arg(long = "type", value_name = "TYPE")]
        item_type: Option<String>,

        /// Allow a purge without any filter (deletes the whole catalog)
        #[arg(long)]
        all: bool,

        /// Count matching products without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute theme and series for every product
    Reclassify,
    /// Print the classifier output for a name
    Classify {
        /// Catalog item name
        name: String,

        /// BrickLink item number
        #[arg(long, default_value = "")]
        item_no: String,
    },
}

#[derive(Subcommand)]
enum SyncTarget {
    /// Upsert the store inventory into the catalog
    Inventory {
        /// Only sync minifigure lots
        #[arg(long)]
        minifigs_only: bool,

        /// Delete local products missing from the BrickLink feed
        #[arg(long)]
        purge_missing: bool,

        /// Fetch and transform without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch catalog details for minifigs
    Minifigs {
        /// Stop after this many item numbers
        #[arg(long)]
        limit: Option<i64>,

        /// Refetch details that already exist
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sync { target } => match target {
            SyncTarget::Inventory {
                minifigs_only,
                purge_missing,
                dry_run,
            } => {
                commands::sync::inventory(commands::sync::InventoryOptions {
                    minifigs_only,
                    purge_missing,
                    dry_run,
                })
                .await?;
            }
            SyncTarget::Minifigs { limit, refresh } => {
                commands::sync::minifigs(limit, refresh).await?;
            }
        },
        Commands::Import { file, dry_run } => {
            commands::import::run(&file, dry_run).await?;
        }
        Commands::Purge {
            zero_stock,
            item_type,
            all,
            dry_run,
        } => {
            commands::purge::run(zero_stock, item_type.as_deref(), all, dry_run).await?;
        }
        Commands::Reclassify => commands::classify::reclassify().await?,
        Commands::Classify { name, item_no } => commands::classify::classify(&name, &item_no),
    }
    Ok(())
}
