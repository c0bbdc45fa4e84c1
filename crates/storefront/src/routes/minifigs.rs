//! Minifigure route handlers.
//!
//! Same filters as `/api/products`, restricted to minifigures and joined
//! with the catalog details fetched by `bh-cli sync minifigs`.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use brickhaus_core::catalog::{CatalogQuery, Page};

use crate::db::{MinifigRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{EnrichedProduct, MinifigDetails, Product};
use crate::state::AppState;

/// Every listing of one minifigure, with its catalog details.
#[derive(Debug, Serialize)]
pub struct MinifigView {
    pub item_no: String,
    pub details: Option<MinifigDetails>,
    pub listings: Vec<Product>,
}

/// GET /api/minifigs
///
/// # Errors
///
/// Returns `AppError::Filter` for invalid query parameters.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Page<EnrichedProduct>>> {
    let filter = query.into_filter()?;
    let (items, total) = ProductRepository::new(state.pool())
        .list_minifigs(&filter)
        .await?;
    Ok(Json(Page::new(items, &filter, total)))
}

/// GET /api/minifigs/{item_no}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the figure has neither listings nor details.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(item_no): Path<String>,
) -> Result<Json<MinifigView>> {
    let item_no = item_no.trim();
    if item_no.is_empty() {
        return Err(AppError::BadRequest("item number is required".to_string()));
    }

    let listings = ProductRepository::new(state.pool())
        .minifig_listings(item_no)
        .await?;
    let details = MinifigRepository::new(state.pool()).get(item_no).await?;

    if listings.is_empty() && details.is_none() {
        return Err(AppError::NotFound(format!("minifig {item_no}")));
    }

    Ok(Json(MinifigView {
        item_no: details
            .as_ref()
            .map(|d| d.item_no.clone())
            .or_else(|| listings.first().map(|p| p.item_no.clone()))
            .unwrap_or_else(|| item_no.to_string()),
        details,
        listings,
    }))
}
