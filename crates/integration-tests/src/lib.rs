//! Integration tests for Brickhaus.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! bh-cli migrate
//!
//! # Start the storefront with an admin token
//! BRICKHAUS_ADMIN_TOKEN=... cargo run -p brickhaus-storefront
//!
//! # Run the ignored tests against it
//! cargo test -p brickhaus-integration-tests -- --ignored
//! ```
//!
//! The order stock tests only need the database and run without `--ignored`.
//! They skip when no database URL is set.
//!
//! # Environment Variables
//!
//! - `BRICKHAUS_TEST_URL` - Storefront base URL (default: `http://localhost:3000`)
//! - `BRICKHAUS_ADMIN_TOKEN` - Same token the server was started with
//! - `BRICKHAUS_DATABASE_URL` - Database the server uses, for seeding

use std::sync::atomic::{AtomicI64, Ordering};

use brickhaus_core::{Condition, InventoryId, ItemType};
use brickhaus_storefront::config;
use brickhaus_storefront::db::{self, ProductRepository};
use brickhaus_storefront::models::NewProduct;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Seeded inventory ids start far above real BrickLink lot ids.
const SEED_ID_BASE: i64 = 9_000_000_000;

static NEXT_SEED_ID: AtomicI64 = AtomicI64::new(0);

/// Shared handles for a test run.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub admin_token: String,
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to the running server's database.
    ///
    /// # Panics
    ///
    /// Panics if the environment is incomplete or the database is unreachable.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("BRICKHAUS_TEST_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let admin_token =
            std::env::var("BRICKHAUS_ADMIN_TOKEN").expect("BRICKHAUS_ADMIN_TOKEN must be set");
        let database_url = config::database_url_from_env().expect("database URL must be set");
        let pool = db::create_pool(&database_url)
            .await
            .expect("Failed to connect to database");

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token,
            pool,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Request with the admin bearer token.
    #[must_use]
    pub fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.admin_token)
    }

    /// Insert a minifig listing with a fresh inventory id.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn seed_minifig(&self, name: &str, item_no: &str, price: Decimal, qty: i32) -> InventoryId {
        seed_minifig(&self.pool, name, item_no, price, qty).await
    }

    /// Current stock of a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn stock(&self, id: InventoryId) -> i32 {
        stock(&self.pool, id).await
    }

    /// Remove a seeded product.
    pub async fn cleanup(&self, id: InventoryId) {
        let _ = ProductRepository::new(&self.pool).delete(id).await;
    }
}

/// Connect to the test database and apply migrations, without a running server.
///
/// Returns `None` when no database URL is configured so database-backed
/// tests can skip instead of fail.
///
/// # Panics
///
/// Panics if a URL is set but the database is unreachable or a migration fails.
pub async fn database() -> Option<PgPool> {
    let database_url = config::database_url_from_env().ok()?;
    let pool = db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    db::migrate(&pool).await.expect("Failed to apply migrations");
    Some(pool)
}

/// Insert a minifig listing with a fresh inventory id.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_minifig(pool: &PgPool, name: &str, item_no: &str, price: Decimal, qty: i32) -> InventoryId {
    let offset = NEXT_SEED_ID.fetch_add(1, Ordering::SeqCst);
    let id = InventoryId::new(SEED_ID_BASE + i64::from(std::process::id()) * 1_000 + offset);
    let product = NewProduct::classified(
        id,
        item_no.to_string(),
        name.to_string(),
        ItemType::Minifig,
        Condition::Used,
        price,
        qty,
    );
    ProductRepository::new(pool)
        .upsert_many(&[product])
        .await
        .expect("Failed to seed product");
    id
}

/// Current stock of a product.
///
/// # Panics
///
/// Panics if the product does not exist.
pub async fn stock(pool: &PgPool, id: InventoryId) -> i32 {
    ProductRepository::new(pool)
        .get(id)
        .await
        .expect("Failed to read product")
        .expect("Product does not exist")
        .qty
}
