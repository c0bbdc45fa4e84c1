//! Theme and series facet counts, cached for a minute.

use axum::{Json, extract::State};

use brickhaus_core::catalog::Facet;

use crate::error::Result;
use crate::state::AppState;

/// GET /api/themes
///
/// # Errors
///
/// Returns `AppError::Database` on a cache miss whose query fails.
pub async fn themes(State(state): State<AppState>) -> Result<Json<Vec<Facet<String>>>> {
    Ok(Json(state.facets().themes(state.pool()).await?))
}

/// GET /api/series
///
/// # Errors
///
/// Returns `AppError::Database` on a cache miss whose query fails.
pub async fn series(State(state): State<AppState>) -> Result<Json<Vec<Facet<i32>>>> {
    Ok(Json(state.facets().series(state.pool()).await?))
}
