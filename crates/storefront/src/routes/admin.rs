//! Admin route handlers.
//!
//! Mounted under `/api/admin` behind [`crate::middleware::require_admin`].
//! Stock changes drop the cached facet counts so the theme and series
//! listings reflect them right away.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use brickhaus_core::{InventoryId, OrderStatus};

use super::orders::parse_reference;
use super::products::parse_inventory_id;
use crate::db::{OrderRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::Order;
use crate::services::CheckoutService;
use crate::services::checkout::FinalizedOrder;
use crate::state::AppState;

const DEFAULT_ORDER_LIMIT: i64 = 50;
const MAX_ORDER_LIMIT: i64 = 200;
/// Largest single restock. Keeps `qty + added` well inside `INTEGER`.
const MAX_RESTOCK_QTY: i32 = 10_000;

/// Restock request body.
#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub qty: i32,
}

/// Stock level after a restock.
#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub inventory_id: InventoryId,
    pub qty: i32,
}

/// Order listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Refund request body.
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    #[serde(default = "default_restock")]
    pub restock: bool,
}

impl Default for RefundRequest {
    fn default() -> Self {
        Self {
            restock: default_restock(),
        }
    }
}

const fn default_restock() -> bool {
    true
}

/// POST /api/admin/products/{inventory_id}/restock
///
/// # Errors
///
/// Returns `AppError::BadRequest` unless `qty` is positive and
/// `AppError::Database` (404) for an unknown product.
#[instrument(skip(state))]
pub async fn restock(
    State(state): State<AppState>,
    Path(inventory_id): Path<String>,
    Json(request): Json<RestockRequest>,
) -> Result<Json<StockLevel>> {
    let id = parse_inventory_id(&inventory_id)?;
    if request.qty <= 0 {
        return Err(AppError::BadRequest("qty must be greater than 0".to_string()));
    }
    if request.qty > MAX_RESTOCK_QTY {
        return Err(AppError::BadRequest(format!(
            "qty must be at most {MAX_RESTOCK_QTY}"
        )));
    }

    let qty = ProductRepository::new(state.pool())
        .restock(id, request.qty)
        .await?;
    state.facets().invalidate_all().await;

    info!(inventory_id = %id, added = request.qty, qty, "Product restocked");
    Ok(Json(StockLevel {
        inventory_id: id,
        qty,
    }))
}

/// DELETE /api/admin/products/{inventory_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown product.
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(inventory_id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_inventory_id(&inventory_id)?;
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    state.facets().invalidate_all().await;

    info!(inventory_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/orders?status=&limit=&offset=
///
/// Newest first.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown status.
#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ORDER_LIMIT)
        .clamp(1, MAX_ORDER_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let orders = OrderRepository::new(state.pool())
        .list(status, limit, offset)
        .await?;
    Ok(Json(orders))
}

/// POST /api/admin/orders/{reference}/refund
///
/// Body is optional; `restock` defaults to `true`.
///
/// # Errors
///
/// Returns `AppError::Checkout` unless the order is PAID or if the provider
/// refuses the refund.
#[instrument(skip(state, body))]
pub async fn refund_order(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    body: Option<Json<RefundRequest>>,
) -> Result<Json<Order>> {
    let reference = parse_reference(&reference)?;
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let order = CheckoutService::new(&state)
        .refund(reference, request.restock)
        .await?;
    if request.restock {
        state.facets().invalidate_all().await;
    }

    info!(%reference, restock = request.restock, "Order refunded");
    Ok(Json(order))
}

/// POST /api/admin/orders/{reference}/mark-paid
///
/// For bank transfers once the money has arrived.
///
/// # Errors
///
/// Returns `AppError::Checkout` unless the order is PENDING.
#[instrument(skip(state))]
pub async fn mark_order_paid(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<FinalizedOrder>> {
    let reference = parse_reference(&reference)?;
    let finalized = CheckoutService::new(&state).mark_paid(reference).await?;
    if finalized.newly_paid {
        state.facets().invalidate_all().await;
    }
    Ok(Json(finalized))
}

/// POST /api/admin/orders/{reference}/cancel
///
/// # Errors
///
/// Returns `AppError::Checkout` unless the order is PENDING.
#[instrument(skip(state))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Order>> {
    let reference = parse_reference(&reference)?;
    let order = CheckoutService::new(&state).cancel(reference).await?;
    info!(%reference, "Order cancelled");
    Ok(Json(order))
}
