//! Checkout service.
//!
//! Turns a client cart into a PENDING order priced from the catalog, hands
//! it to a payment provider, and finalizes it once the provider reports the
//! money as received. Finalization is idempotent: only the caller that moves
//! the order from PENDING to PAID takes stock and sends the confirmation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use brickhaus_core::cart::{Cart, CartItem, Totals};
use brickhaus_core::{
    Email, EmailError, InventoryId, OrderReference, OrderStatus, PaymentProvider,
};

use super::email::EmailService;
use crate::config::{BankTransferConfig, StorefrontConfig};
use crate::db::orders::{PaidOutcome, PaymentConfirmation};
use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{NewOrder, NewOrderLine, Order, OrderWithLines, Product, PublicOrder};
use crate::payments::stripe::CheckoutSession;
use crate::payments::{PayPalClient, PaymentError, StripeClient};
use crate::state::AppState;

/// `PayPal` error issue when the order was captured by an earlier request.
const PAYPAL_ALREADY_CAPTURED: &str = "ORDER_ALREADY_CAPTURED";

/// Stripe events that mean a Checkout Session has been paid for.
const STRIPE_PAID_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
];

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line refers to a listing that does not exist (any more).
    #[error("item {0} is no longer available")]
    UnknownItem(InventoryId),

    /// A cart line asks for more than is in stock.
    #[error("only {available} of item {inventory_id} in stock, {requested} requested")]
    InsufficientStock {
        inventory_id: InventoryId,
        requested: u32,
        available: i32,
    },

    /// The order is not in a status that allows the action.
    #[error("order is {from:?} and cannot become {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// No order matches the given reference or provider id.
    #[error("order not found")]
    OrderNotFound,

    /// The provider has not (yet) received the money.
    #[error("payment not completed: {0}")]
    PaymentNotCompleted(String),

    /// Invalid customer email.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The requested payment method is not configured.
    #[error("{0} is not enabled")]
    ProviderDisabled(&'static str),

    /// Payment provider error.
    #[error("payment provider error: {0}")]
    Payment(#[from] PaymentError),

    /// Only bank transfers are marked paid by hand; card and PayPal
    /// payments are confirmed by their provider.
    #[error("{0} orders are paid through their provider")]
    NotManuallyPayable(PaymentProvider),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Request / response types
// =============================================================================

/// Body of every checkout route: the client cart plus optional payer details.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Why a cart line was changed by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartIssue {
    /// The listing no longer exists or is sold out; the line was removed.
    Unavailable { sku: InventoryId },
    /// Fewer units are in stock than requested; the line was clamped.
    QuantityReduced { sku: InventoryId, requested: u32, available: u32 },
    /// The catalog price differs from the client's.
    PriceChanged {
        sku: InventoryId,
        previous: rust_decimal::Decimal,
        current: rust_decimal::Decimal,
    },
}

/// A repriced, stock-clamped cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartValidation {
    pub cart: Cart,
    pub issues: Vec<CartIssue>,
    pub totals: Totals,
}

/// Answer to `POST /api/checkout/paypal`.
#[derive(Debug, Clone, Serialize)]
pub struct PayPalCheckout {
    pub reference: OrderReference,
    pub paypal_order_id: String,
    pub approve_url: Option<String>,
    pub totals: Totals,
}

/// Answer to `POST /api/checkout/stripe`.
#[derive(Debug, Clone, Serialize)]
pub struct StripeCheckout {
    pub reference: OrderReference,
    pub session_id: String,
    pub url: Option<String>,
    pub totals: Totals,
}

/// Answer to `POST /api/checkout/bank-transfer`.
#[derive(Debug, Clone, Serialize)]
pub struct BankTransferCheckout {
    pub reference: OrderReference,
    /// What the customer should put in the transfer's description.
    pub payment_reference: String,
    pub account_holder: String,
    pub iban: String,
    pub bic: Option<String>,
    pub totals: Totals,
}

/// A finalized order.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedOrder {
    pub order: PublicOrder,
    /// Whether this call performed the PENDING to PAID transition.
    pub newly_paid: bool,
    /// Lines whose stock ran short when the payment landed.
    pub oversold: Vec<InventoryId>,
}

// =============================================================================
// Service
// =============================================================================

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    config: &'a StorefrontConfig,
    paypal: Option<&'a PayPalClient>,
    stripe: Option<&'a StripeClient>,
    email: Option<&'a EmailService>,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service over the shared application state.
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            config: state.config(),
            paypal: state.paypal(),
            stripe: state.stripe(),
            email: state.email(),
        }
    }

    fn orders(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.pool)
    }

    fn paypal(&self) -> Result<&'a PayPalClient, CheckoutError> {
        self.paypal.ok_or(CheckoutError::ProviderDisabled("PayPal"))
    }

    fn stripe(&self) -> Result<&'a StripeClient, CheckoutError> {
        self.stripe.ok_or(CheckoutError::ProviderDisabled("Stripe"))
    }

    fn bank_transfer(&self) -> Result<&'a BankTransferConfig, CheckoutError> {
        self.config
            .bank_transfer
            .as_ref()
            .ok_or(CheckoutError::ProviderDisabled("bank transfer"))
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Reprice a client cart from the catalog and clamp it to stock.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the catalog cannot be read.
    pub async fn validate_cart(&self, cart: Cart) -> Result<CartValidation, CheckoutError> {
        let cart = cart.normalized();
        let products = self.load_products(&cart).await?;
        Ok(reconcile(
            cart,
            &products,
            |subtotal| Totals::compute(subtotal, &self.config.shipping, self.config.currency),
        ))
    }

    async fn load_products(&self, cart: &Cart) -> Result<HashMap<InventoryId, Product>, CheckoutError> {
        let ids: Vec<InventoryId> = cart.items.iter().map(|item| item.sku).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;
        Ok(products
            .into_iter()
            .map(|product| (product.inventory_id, product))
            .collect())
    }

    /// Price a checkout request strictly: every line must exist and be in stock.
    async fn price_order(
        &self,
        request: CheckoutRequest,
        provider: PaymentProvider,
    ) -> Result<NewOrder, CheckoutError> {
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(Email::parse)
            .transpose()?;
        let cart = Cart {
            items: request.items,
        }
        .normalized();
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let products = self.load_products(&cart).await?;
        let lines = order_lines(&cart, &products)?;
        let subtotal = lines
            .iter()
            .map(|line| line.unit_price * rust_decimal::Decimal::from(line.qty))
            .sum();

        Ok(NewOrder {
            reference: OrderReference::generate(),
            provider,
            totals: Totals::compute(subtotal, &self.config.shipping, self.config.currency),
            email,
            customer_name: request
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            lines,
        })
    }

    // =========================================================================
    // PayPal
    // =========================================================================

    /// Create a pending order and the matching `PayPal` order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is invalid, `PayPal` is disabled,
    /// or `PayPal` rejects the order. A rejected order is cancelled locally.
    #[instrument(skip_all)]
    pub async fn start_paypal(&self, request: CheckoutRequest) -> Result<PayPalCheckout, CheckoutError> {
        let paypal = self.paypal()?;
        let new_order = self.price_order(request, PaymentProvider::PayPal).await?;
        let order = self.orders().create(&new_order).await?;

        let return_url = format!(
            "{}/checkout/paypal/return?reference={}",
            self.config.base_url, new_order.reference
        );
        let cancel_url = format!("{}/cart", self.config.base_url);

        let paypal_order = match paypal.create_order(&new_order, &return_url, &cancel_url).await {
            Ok(paypal_order) => paypal_order,
            Err(e) => {
                self.abandon(&order).await;
                return Err(e.into());
            }
        };
        self.orders()
            .set_paypal_order_id(order.id, &paypal_order.id)
            .await?;

        info!(reference = %order.reference, paypal_order_id = %paypal_order.id, "PayPal checkout started");
        Ok(PayPalCheckout {
            reference: order.reference,
            approve_url: paypal_order.approve_url().map(ToString::to_string),
            paypal_order_id: paypal_order.id,
            totals: new_order.totals,
        })
    }

    /// Capture an approved `PayPal` order and finalize the shop order.
    ///
    /// Capturing twice is harmless: `PayPal` answers the second capture with
    /// `ORDER_ALREADY_CAPTURED`, the current order is fetched instead, and
    /// finalization is a no-op for an order that is already PAID.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` for an unknown `PayPal` order and
    /// `CheckoutError::PaymentNotCompleted` if the capture did not complete.
    #[instrument(skip(self))]
    pub async fn capture_paypal(&self, paypal_order_id: &str) -> Result<FinalizedOrder, CheckoutError> {
        let paypal = self.paypal()?;
        let order = self
            .orders()
            .find_by_paypal_order(paypal_order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if order.status != OrderStatus::Pending {
            return self.finalize(order, PaymentConfirmation::default()).await;
        }

        let captured = match paypal.capture_order(paypal_order_id).await {
            Ok(captured) => captured,
            Err(e @ PaymentError::Api { .. }) if e.to_string().contains(PAYPAL_ALREADY_CAPTURED) => {
                paypal.get_order(paypal_order_id).await?
            }
            Err(e) => return Err(e.into()),
        };

        if !captured.is_completed() {
            return Err(CheckoutError::PaymentNotCompleted(captured.status));
        }

        let confirmation = PaymentConfirmation {
            paypal_capture_id: captured.capture_id().map(ToString::to_string),
            stripe_payment_intent: None,
            email: captured.payer_email().map(ToString::to_string),
            name: captured.payer_name(),
        };
        self.finalize(order, confirmation).await
    }

    // =========================================================================
    // Stripe
    // =========================================================================

    /// Create a pending order and a Stripe Checkout Session for it.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is invalid, Stripe is disabled, or
    /// Stripe rejects the session. A rejected order is cancelled locally.
    #[instrument(skip_all)]
    pub async fn start_stripe(&self, request: CheckoutRequest) -> Result<StripeCheckout, CheckoutError> {
        let stripe = self.stripe()?;
        let new_order = self.price_order(request, PaymentProvider::Stripe).await?;
        let order = self.orders().create(&new_order).await?;

        let success_url = format!(
            "{}/checkout/success?reference={}&session_id={{CHECKOUT_SESSION_ID}}",
            self.config.base_url, new_order.reference
        );
        let cancel_url = format!("{}/cart", self.config.base_url);

        let session = match stripe
            .create_checkout_session(&new_order, &success_url, &cancel_url)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.abandon(&order).await;
                return Err(e.into());
            }
        };
        self.orders().set_stripe_session(order.id, &session.id).await?;

        info!(reference = %order.reference, session_id = %session.id, "Stripe checkout started");
        Ok(StripeCheckout {
            reference: order.reference,
            session_id: session.id,
            url: session.url,
            totals: new_order.totals,
        })
    }

    /// Finalize the order behind a Checkout Session if Stripe reports it paid.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` for an unknown session and
    /// `CheckoutError::PaymentNotCompleted` while the session is unpaid.
    #[instrument(skip(self))]
    pub async fn confirm_stripe(&self, session_id: &str) -> Result<FinalizedOrder, CheckoutError> {
        let stripe = self.stripe()?;
        let order = self
            .orders()
            .find_by_stripe_session(session_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if order.status != OrderStatus::Pending {
            return self.finalize(order, PaymentConfirmation::default()).await;
        }

        let session = stripe.retrieve_session(session_id).await?;
        self.finalize_session(order, &session).await
    }

    /// Handle a signed Stripe webhook.
    ///
    /// Returns the finalized order for session payment events and `None` for
    /// events that need no action.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Payment` for a bad signature and
    /// `CheckoutError::OrderNotFound` for a session this shop did not create.
    #[instrument(skip_all)]
    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<Option<FinalizedOrder>, CheckoutError> {
        let stripe = self.stripe()?;
        let event = stripe.parse_webhook(payload, signature_header)?;

        if !STRIPE_PAID_EVENTS.contains(&event.event_type.as_str()) {
            info!(event_id = %event.id, event_type = %event.event_type, "Ignoring Stripe event");
            return Ok(None);
        }

        let session: CheckoutSession = serde_json::from_value(event.data.object).map_err(|e| {
            PaymentError::UnexpectedResponse(format!("invalid checkout session: {e}"))
        })?;

        let order = match self.orders().find_by_stripe_session(&session.id).await? {
            Some(order) => order,
            None => self.order_by_client_reference(&session).await?,
        };

        if !session.is_paid() {
            info!(reference = %order.reference, payment_status = %session.payment_status, "Session completed without payment yet");
            return Ok(None);
        }

        self.finalize_session(order, &session).await.map(Some)
    }

    async fn order_by_client_reference(&self, session: &CheckoutSession) -> Result<Order, CheckoutError> {
        let reference = session
            .client_reference_id
            .as_deref()
            .and_then(|r| r.parse::<OrderReference>().ok())
            .ok_or(CheckoutError::OrderNotFound)?;
        self.orders()
            .get_by_reference(reference)
            .await?
            .map(|with_lines| with_lines.order)
            .ok_or(CheckoutError::OrderNotFound)
    }

    async fn finalize_session(
        &self,
        order: Order,
        session: &CheckoutSession,
    ) -> Result<FinalizedOrder, CheckoutError> {
        if !session.is_paid() {
            return Err(CheckoutError::PaymentNotCompleted(session.payment_status.clone()));
        }

        let confirmation = PaymentConfirmation {
            paypal_capture_id: None,
            stripe_payment_intent: session.payment_intent.clone(),
            email: session.customer_email().map(ToString::to_string),
            name: session.customer_name().map(ToString::to_string),
        };
        self.finalize(order, confirmation).await
    }

    // =========================================================================
    // Bank transfer
    // =========================================================================

    /// Create a pending order to be paid by bank transfer.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is invalid or bank transfer is disabled.
    #[instrument(skip_all)]
    pub async fn start_bank_transfer(
        &self,
        request: CheckoutRequest,
    ) -> Result<BankTransferCheckout, CheckoutError> {
        let bank = self.bank_transfer()?;
        let new_order = self
            .price_order(request, PaymentProvider::BankTransfer)
            .await?;
        let order = self.orders().create(&new_order).await?;

        info!(reference = %order.reference, total = %new_order.totals.total, "Bank transfer checkout started");
        Ok(BankTransferCheckout {
            reference: order.reference,
            payment_reference: order.reference.short_code(),
            account_holder: bank.account_holder.clone(),
            iban: bank.iban.clone(),
            bic: bank.bic.clone(),
            totals: new_order.totals,
        })
    }

    // =========================================================================
    // Finalize / admin actions
    // =========================================================================

    /// Move an order to PAID, take its lines out of stock and send the
    /// confirmation email.
    ///
    /// Calling this for an order that is already PAID returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` for a cancelled or refunded order.
    pub async fn finalize(
        &self,
        order: Order,
        confirmation: PaymentConfirmation,
    ) -> Result<FinalizedOrder, CheckoutError> {
        let outcome = self.orders().mark_paid(order.id, &confirmation).await?;

        let (order, newly_paid, oversold) = match outcome {
            PaidOutcome::Paid { order, oversold } => (order, true, oversold),
            PaidOutcome::AlreadyProcessed(order) if order.status == OrderStatus::Paid => {
                (order, false, Vec::new())
            }
            PaidOutcome::AlreadyProcessed(order) => {
                return Err(CheckoutError::InvalidTransition {
                    from: order.status,
                    to: OrderStatus::Paid,
                });
            }
        };

        let lines = self.orders().lines(order.id).await?;
        let with_lines = OrderWithLines { order, lines };

        if newly_paid {
            info!(
                reference = %with_lines.order.reference,
                provider = ?with_lines.order.provider,
                total = %with_lines.order.total,
                oversold = oversold.len(),
                "Order paid"
            );
            self.send_confirmation(&with_lines);
        }

        Ok(FinalizedOrder {
            order: with_lines.into(),
            newly_paid,
            oversold,
        })
    }

    /// Send the confirmation in the background. Failure is logged only.
    fn send_confirmation(&self, order: &OrderWithLines) {
        let Some(mailer) = self.email.cloned() else {
            return;
        };
        if order.order.email.is_none() {
            warn!(reference = %order.order.reference, "Paid order has no email address");
            return;
        }

        let order = order.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_order_confirmation(&order).await {
                warn!(reference = %order.order.reference, error = %e, "Failed to send order confirmation");
            }
        });
    }

    /// Mark a pending order paid by hand (bank transfer received).
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound`, `CheckoutError::NotManuallyPayable`
    /// for PayPal and Stripe orders, or `CheckoutError::InvalidTransition`.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, reference: OrderReference) -> Result<FinalizedOrder, CheckoutError> {
        let order = self.order(reference).await?;
        ensure_manually_payable(&order)?;
        self.finalize(order, PaymentConfirmation::default()).await
    }

    /// Refund a paid order through its provider and, with `restock`, return
    /// its lines to stock.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` unless the order is PAID,
    /// and `CheckoutError::Payment` if the provider refuses the refund.
    #[instrument(skip(self))]
    pub async fn refund(&self, reference: OrderReference, restock: bool) -> Result<Order, CheckoutError> {
        let order = self.order(reference).await?;
        ensure_transition(&order, OrderStatus::Refunded)?;

        match order.provider {
            PaymentProvider::PayPal => {
                let capture_id = order.paypal_capture_id.as_deref().ok_or_else(|| {
                    PaymentError::UnexpectedResponse("paid PayPal order has no capture id".to_string())
                })?;
                let refund_id = self.paypal()?.refund_capture(capture_id).await?;
                info!(%reference, %refund_id, "PayPal capture refunded");
            }
            PaymentProvider::Stripe => {
                let payment_intent = order.stripe_payment_intent.as_deref().ok_or_else(|| {
                    PaymentError::UnexpectedResponse("paid Stripe order has no payment intent".to_string())
                })?;
                let refund_id = self.stripe()?.refund(payment_intent).await?;
                info!(%reference, %refund_id, "Stripe payment refunded");
            }
            PaymentProvider::BankTransfer => {
                info!(%reference, "Bank transfer refund recorded; pay back manually");
            }
        }

        let refunded = self.orders().mark_refunded(order.id, restock).await?;
        Ok(refunded)
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` or `CheckoutError::InvalidTransition`.
    #[instrument(skip(self))]
    pub async fn cancel(&self, reference: OrderReference) -> Result<Order, CheckoutError> {
        let order = self.order(reference).await?;
        ensure_transition(&order, OrderStatus::Cancelled)?;
        Ok(self.orders().cancel(order.id).await?)
    }

    async fn order(&self, reference: OrderReference) -> Result<Order, CheckoutError> {
        self.orders()
            .get_by_reference(reference)
            .await?
            .map(|with_lines| with_lines.order)
            .ok_or(CheckoutError::OrderNotFound)
    }

    /// Cancel an order whose provider step failed. Failure is logged only.
    async fn abandon(&self, order: &Order) {
        if let Err(e) = self.orders().cancel(order.id).await {
            warn!(reference = %order.reference, error = %e, "Failed to cancel abandoned order");
        }
    }
}

/// A hand-marked payment leaves no capture or payment intent to refund
/// against, so only bank transfers qualify.
fn ensure_manually_payable(order: &Order) -> Result<(), CheckoutError> {
    if order.provider != PaymentProvider::BankTransfer {
        return Err(CheckoutError::NotManuallyPayable(order.provider));
    }
    ensure_transition(order, OrderStatus::Paid)
}

fn ensure_transition(order: &Order, to: OrderStatus) -> Result<(), CheckoutError> {
    if order.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(CheckoutError::InvalidTransition {
            from: order.status,
            to,
        })
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Reprice and clamp a normalized cart against catalog rows.
///
/// Lines for unknown or sold-out listings are dropped, quantities above
/// stock are reduced, and every price is replaced by the catalog price.
fn reconcile(
    cart: Cart,
    products: &HashMap<InventoryId, Product>,
    totals: impl Fn(rust_decimal::Decimal) -> Totals,
) -> CartValidation {
    let mut issues = Vec::new();
    let mut validated = Cart::new();

    for mut item in cart.items {
        let Some(product) = products.get(&item.sku) else {
            issues.push(CartIssue::Unavailable { sku: item.sku });
            continue;
        };

        let available = u32::try_from(product.qty).unwrap_or(0);
        if available == 0 {
            issues.push(CartIssue::Unavailable { sku: item.sku });
            continue;
        }
        if item.qty > available {
            issues.push(CartIssue::QuantityReduced {
                sku: item.sku,
                requested: item.qty,
                available,
            });
            item.qty = available;
        }
        if item.price != product.price {
            issues.push(CartIssue::PriceChanged {
                sku: item.sku,
                previous: item.price,
                current: product.price,
            });
        }

        item.price = product.price;
        item.name.clone_from(&product.name);
        item.image_url.clone_from(&product.image_url);
        validated.items.push(item);
    }

    let totals = totals(validated.subtotal());
    CartValidation {
        cart: validated,
        issues,
        totals,
    }
}

/// Snapshot order lines for a normalized cart, rejecting unknown and
/// over-stock lines.
fn order_lines(
    cart: &Cart,
    products: &HashMap<InventoryId, Product>,
) -> Result<Vec<NewOrderLine>, CheckoutError> {
    cart.items
        .iter()
        .map(|item| {
            let product = products
                .get(&item.sku)
                .ok_or(CheckoutError::UnknownItem(item.sku))?;
            if !product.has_stock(item.qty) {
                return Err(CheckoutError::InsufficientStock {
                    inventory_id: item.sku,
                    requested: item.qty,
                    available: product.qty,
                });
            }
            let qty = i32::try_from(item.qty).map_err(|_| CheckoutError::InsufficientStock {
                inventory_id: item.sku,
                requested: item.qty,
                available: product.qty,
            })?;

            Ok(NewOrderLine {
                inventory_id: product.inventory_id,
                item_no: product.item_no.clone(),
                name: product.name.clone(),
                condition: product.condition,
                unit_price: product.price,
                qty,
                image_url: product.image_url.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brickhaus_core::cart::ShippingPolicy;
    use brickhaus_core::{Condition, CurrencyCode, ItemType, OrderId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i64, price_cents: i64, qty: i32) -> Product {
        Product {
            inventory_id: InventoryId::new(id),
            item_no: format!("sw{id:04}"),
            name: format!("Figure {id}"),
            item_type: ItemType::Minifig,
            condition: Condition::Used,
            price: Decimal::new(price_cents, 2),
            qty,
            image_url: None,
            remarks: None,
            description: None,
            theme: "Star Wars".to_string(),
            series: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order(provider: PaymentProvider, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            reference: OrderReference::generate(),
            status,
            provider,
            currency: "EUR".to_string(),
            subtotal: Decimal::new(1200, 2),
            shipping: Decimal::new(495, 2),
            total: Decimal::new(1695, 2),
            email: None,
            customer_name: None,
            paypal_order_id: None,
            paypal_capture_id: None,
            stripe_session_id: None,
            stripe_payment_intent: None,
            created_at: Utc::now(),
            paid_at: None,
            refunded_at: None,
            cancelled_at: None,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<InventoryId, Product> {
        products.into_iter().map(|p| (p.inventory_id, p)).collect()
    }

    fn item(id: i64, price_cents: i64, qty: u32) -> CartItem {
        CartItem {
            sku: InventoryId::new(id),
            name: "stale name".to_string(),
            price: Decimal::new(price_cents, 2),
            qty,
            image_url: None,
        }
    }

    fn totals(subtotal: Decimal) -> Totals {
        let policy = ShippingPolicy {
            flat_rate: Decimal::new(495, 2),
            free_over: Some(Decimal::new(7500, 2)),
        };
        Totals::compute(subtotal, &policy, CurrencyCode::EUR)
    }

    #[test]
    fn test_reconcile_reprices_and_clamps() {
        let products = catalog(vec![product(1, 500, 1), product(2, 1000, 5), product(3, 300, 0)]);
        let cart = Cart {
            items: vec![item(1, 500, 3), item(2, 900, 2), item(3, 300, 1), item(4, 100, 1)],
        };

        let result = reconcile(cart, &products, totals);

        assert_eq!(result.cart.items.len(), 2);
        assert_eq!(result.cart.items[0].qty, 1);
        assert_eq!(result.cart.items[0].name, "Figure 1");
        assert_eq!(result.cart.items[1].price, Decimal::new(1000, 2));
        assert_eq!(
            result.issues,
            vec![
                CartIssue::QuantityReduced {
                    sku: InventoryId::new(1),
                    requested: 3,
                    available: 1
                },
                CartIssue::PriceChanged {
                    sku: InventoryId::new(2),
                    previous: Decimal::new(900, 2),
                    current: Decimal::new(1000, 2)
                },
                CartIssue::Unavailable {
                    sku: InventoryId::new(3)
                },
                CartIssue::Unavailable {
                    sku: InventoryId::new(4)
                },
            ]
        );
        // 5.00 + 2 * 10.00 = 25.00, below the free shipping threshold
        assert_eq!(result.totals.subtotal.amount, Decimal::new(2500, 2));
        assert_eq!(result.totals.total.amount, Decimal::new(2995, 2));
    }

    #[test]
    fn test_reconcile_empty_cart_ships_free() {
        let result = reconcile(Cart::new(), &HashMap::new(), totals);
        assert!(result.issues.is_empty());
        assert_eq!(result.totals.total.amount, Decimal::ZERO);
    }

    #[test]
    fn test_order_lines_use_catalog_prices() {
        let products = catalog(vec![product(1, 450, 2)]);
        let cart = Cart {
            items: vec![item(1, 1, 2)],
        };

        let lines = order_lines(&cart, &products).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price, Decimal::new(450, 2));
        assert_eq!(lines[0].qty, 2);
        assert_eq!(lines[0].item_no, "sw0001");
    }

    #[test]
    fn test_order_lines_reject_unknown_and_overstock() {
        let products = catalog(vec![product(1, 450, 1)]);

        let over = Cart {
            items: vec![item(1, 450, 2)],
        };
        assert!(matches!(
            order_lines(&over, &products),
            Err(CheckoutError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));

        let unknown = Cart {
            items: vec![item(9, 450, 1)],
        };
        assert!(matches!(
            order_lines(&unknown, &products),
            Err(CheckoutError::UnknownItem(id)) if id == InventoryId::new(9)
        ));
    }

    #[test]
    fn test_checkout_request_accepts_client_cart() {
        let json = r#"{
            "items": [{"sku": 42, "name": "Yoda", "price": "3.50", "qty": 1, "image_url": null}],
            "email": "fan@example.org"
        }"#;
        let request: CheckoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items[0].sku, InventoryId::new(42));
        assert_eq!(request.name, None);
    }

    #[test]
    fn test_pending_bank_transfer_can_be_marked_paid() {
        let pending = order(PaymentProvider::BankTransfer, OrderStatus::Pending);
        assert!(ensure_manually_payable(&pending).is_ok());
    }

    #[test]
    fn test_provider_orders_cannot_be_marked_paid_by_hand() {
        for provider in [PaymentProvider::PayPal, PaymentProvider::Stripe] {
            let pending = order(provider, OrderStatus::Pending);
            assert!(matches!(
                ensure_manually_payable(&pending),
                Err(CheckoutError::NotManuallyPayable(p)) if p == provider
            ));
        }
    }

    #[test]
    fn test_cancelled_bank_transfer_cannot_be_marked_paid() {
        let cancelled = order(PaymentProvider::BankTransfer, OrderStatus::Cancelled);
        assert!(matches!(
            ensure_manually_payable(&cancelled),
            Err(CheckoutError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Paid
            })
        ));
    }
}
