//! Catalog listing route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use brickhaus_core::InventoryId;
use brickhaus_core::catalog::{CatalogQuery, Page};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// GET /api/products
///
/// Filtered, sorted and paginated listing.
///
/// # Errors
///
/// Returns `AppError::Filter` for invalid query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Page<Product>>> {
    let filter = query.into_filter()?;
    let (items, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(items, &filter, total)))
}

/// GET /api/products/{inventory_id}
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a non-numeric id and
/// `AppError::NotFound` if no such listing exists.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(inventory_id): Path<String>,
) -> Result<Json<Product>> {
    let id = parse_inventory_id(&inventory_id)?;
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Parse an inventory id path segment.
pub(crate) fn parse_inventory_id(raw: &str) -> Result<InventoryId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid inventory id: {raw}")))
}
