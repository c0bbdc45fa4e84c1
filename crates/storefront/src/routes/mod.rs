//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness (see main.rs)
//! GET  /health/ready                             - Database ping (see main.rs)
//!
//! # Catalog
//! GET  /api/products                             - Filtered listing (page envelope)
//! GET  /api/products/{inventory_id}              - Single listing
//! GET  /api/minifigs                             - Minifig listing with catalog details
//! GET  /api/minifigs/{item_no}                   - Every listing of one figure
//! GET  /api/themes                               - Theme facet counts
//! GET  /api/series                               - CMF series facet counts
//! GET  /api/orders/{reference}                   - Public order status
//! POST /api/cart/validate                        - Reprice and clamp a client cart
//!
//! # Checkout (rate limited per IP, except the webhook)
//! POST /api/checkout/paypal                      - Create order + PayPal order
//! POST /api/checkout/paypal/{id}/capture         - Capture and finalize
//! POST /api/checkout/stripe                      - Create order + Checkout Session
//! POST /api/checkout/stripe/{session_id}/confirm - Finalize if paid
//! POST /api/checkout/stripe/webhook              - Stripe events (signed)
//! POST /api/checkout/bank-transfer               - Create order, return bank details
//!
//! # Admin (bearer token)
//! POST   /api/admin/products/{inventory_id}/restock
//! DELETE /api/admin/products/{inventory_id}
//! GET    /api/admin/orders
//! POST   /api/admin/orders/{reference}/refund
//! POST   /api/admin/orders/{reference}/mark-paid
//! POST   /api/admin/orders/{reference}/cancel
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod minifigs;
pub mod orders;
pub mod products;
pub mod themes;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::middleware::{checkout_rate_limiter, require_admin};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{inventory_id}", get(products::show))
        .route("/minifigs", get(minifigs::index))
        .route("/minifigs/{item_no}", get(minifigs::show))
        .route("/themes", get(themes::themes))
        .route("/series", get(themes::series))
        .route("/orders/{reference}", get(orders::show))
        .route("/cart/validate", post(cart::validate))
}

/// Create the checkout routes router.
///
/// The Stripe webhook is added after the rate limiter so bursts of events
/// from Stripe are never throttled.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/paypal", post(checkout::start_paypal))
        .route("/paypal/{id}/capture", post(checkout::capture_paypal))
        .route("/stripe", post(checkout::start_stripe))
        .route("/stripe/{session_id}/confirm", post(checkout::confirm_stripe))
        .route("/bank-transfer", post(checkout::start_bank_transfer))
        .route_layer(checkout_rate_limiter())
        .route("/stripe/webhook", post(checkout::stripe_webhook))
}

/// Create the admin routes router, guarded by the admin token.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/products/{inventory_id}/restock", post(admin::restock))
        .route(
            "/products/{inventory_id}",
            axum::routing::delete(admin::delete_product),
        )
        .route("/orders", get(admin::list_orders))
        .route("/orders/{reference}/refund", post(admin::refund_order))
        .route("/orders/{reference}/mark-paid", post(admin::mark_order_paid))
        .route("/orders/{reference}/cancel", post(admin::cancel_order))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Create all API routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/api", catalog_routes())
        .nest("/api/checkout", checkout_routes())
        .nest("/api/admin", admin_routes(state))
}
