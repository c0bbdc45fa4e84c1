//! Public order status.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use brickhaus_core::OrderReference;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::models::PublicOrder;
use crate::state::AppState;

/// GET /api/orders/{reference}
///
/// Anyone holding the reference may read the order, so only the public
/// view is returned.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed reference and
/// `AppError::NotFound` for an unknown one.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<PublicOrder>> {
    let reference = parse_reference(&reference)?;
    OrderRepository::new(state.pool())
        .get_by_reference(reference)
        .await?
        .map(|order| Json(order.into()))
        .ok_or_else(|| AppError::NotFound("order".to_string()))
}

/// Parse an order reference path segment.
pub(crate) fn parse_reference(raw: &str) -> Result<OrderReference> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("invalid order reference".to_string()))
}
