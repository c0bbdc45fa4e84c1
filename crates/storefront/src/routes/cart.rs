//! Cart validation.
//!
//! The cart lives on the client. This route reprices it from the catalog
//! and clamps quantities to stock before the customer picks a payment method.

use axum::{Json, extract::State};
use tracing::instrument;

use brickhaus_core::cart::Cart;

use crate::error::Result;
use crate::services::CheckoutService;
use crate::services::checkout::CartValidation;
use crate::state::AppState;

/// POST /api/cart/validate
///
/// # Errors
///
/// Returns `AppError::Checkout` if the catalog cannot be read.
#[instrument(skip_all, fields(lines = cart.items.len()))]
pub async fn validate(
    State(state): State<AppState>,
    Json(cart): Json<Cart>,
) -> Result<Json<CartValidation>> {
    let validation = CheckoutService::new(&state).validate_cart(cart).await?;
    Ok(Json(validation))
}
