//! Checkout route handlers.
//!
//! Every start route creates a PENDING order priced from the catalog, then
//! hands the customer to the payment provider. Finalizing (capture, confirm,
//! webhook) is idempotent, so a redirect and a webhook racing for the same
//! order both succeed.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::services::CheckoutService;
use crate::services::checkout::{
    BankTransferCheckout, CheckoutError, CheckoutRequest, FinalizedOrder, PayPalCheckout,
    StripeCheckout,
};
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    /// Set when the event finalized an order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<FinalizedOrder>,
}

/// POST /api/checkout/paypal
///
/// # Errors
///
/// Returns `AppError::Checkout` if the cart is invalid, `PayPal` is disabled
/// or the order cannot be created.
#[instrument(skip_all)]
pub async fn start_paypal(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<PayPalCheckout>> {
    Ok(Json(CheckoutService::new(&state).start_paypal(request).await?))
}

/// POST /api/checkout/paypal/{id}/capture
///
/// # Errors
///
/// Returns `AppError::Checkout` if the order is unknown or the capture fails.
#[instrument(skip(state))]
pub async fn capture_paypal(
    State(state): State<AppState>,
    Path(paypal_order_id): Path<String>,
) -> Result<Json<FinalizedOrder>> {
    Ok(Json(
        CheckoutService::new(&state)
            .capture_paypal(&paypal_order_id)
            .await?,
    ))
}

/// POST /api/checkout/stripe
///
/// # Errors
///
/// Returns `AppError::Checkout` if the cart is invalid, Stripe is disabled
/// or the session cannot be created.
#[instrument(skip_all)]
pub async fn start_stripe(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<StripeCheckout>> {
    Ok(Json(CheckoutService::new(&state).start_stripe(request).await?))
}

/// POST /api/checkout/stripe/{session_id}/confirm
///
/// # Errors
///
/// Returns `AppError::Checkout` if the session is unknown or not paid yet.
#[instrument(skip(state))]
pub async fn confirm_stripe(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<FinalizedOrder>> {
    Ok(Json(
        CheckoutService::new(&state)
            .confirm_stripe(&session_id)
            .await?,
    ))
}

/// POST /api/checkout/stripe/webhook
///
/// The raw body is needed for signature verification, so this takes
/// `Bytes` rather than `Json`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` without a signature header and
/// `AppError::Checkout` for a bad signature or a failed finalize.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing Stripe-Signature header".to_string()))?;

    let result = CheckoutService::new(&state)
        .handle_stripe_webhook(&body, signature)
        .await;
    Ok(Json(acknowledge(result)?))
}

/// Stripe retries non-2xx answers for days. Events that can never apply
/// (a session from another integration on the same account, or an order
/// cancelled before the payment landed) are logged and acknowledged.
fn acknowledge(
    result: std::result::Result<Option<FinalizedOrder>, CheckoutError>,
) -> std::result::Result<WebhookAck, CheckoutError> {
    match result {
        Ok(order) => Ok(WebhookAck {
            received: true,
            order,
        }),
        Err(CheckoutError::OrderNotFound) => {
            warn!("Stripe webhook for a session without an order");
            Ok(WebhookAck {
                received: true,
                order: None,
            })
        }
        Err(CheckoutError::InvalidTransition { from, to }) => {
            warn!(?from, ?to, "Stripe payment for an order that can no longer be paid");
            Ok(WebhookAck {
                received: true,
                order: None,
            })
        }
        Err(e) => Err(e),
    }
}

/// POST /api/checkout/bank-transfer
///
/// # Errors
///
/// Returns `AppError::Checkout` if the cart is invalid or bank transfer is
/// disabled.
#[instrument(skip_all)]
pub async fn start_bank_transfer(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<BankTransferCheckout>> {
    Ok(Json(
        CheckoutService::new(&state)
            .start_bank_transfer(request)
            .await?,
    ))
}
