//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use brickhaus_core::cart::Totals;
use brickhaus_core::{
    Condition, CurrencyCode, Email, InventoryId, OrderId, OrderReference, OrderStatus,
    PaymentProvider,
};

/// An order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub reference: OrderReference,
    pub status: OrderStatus,
    pub provider: PaymentProvider,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub email: Option<String>,
    pub customer_name: Option<String>,
    pub paypal_order_id: Option<String>,
    pub paypal_capture_id: Option<String>,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The order currency. Unknown codes fall back to the default currency.
    #[must_use]
    pub fn currency_code(&self) -> CurrencyCode {
        self.currency.parse().unwrap_or_default()
    }
}

/// A line snapshot taken when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub inventory_id: InventoryId,
    pub item_no: String,
    pub name: String,
    pub condition: Condition,
    pub unit_price: Decimal,
    pub qty: i32,
    pub image_url: Option<String>,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        brickhaus_core::types::price::round_cents(self.unit_price * Decimal::from(self.qty))
    }
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// What a customer may see about an order.
///
/// Served without authentication to anyone holding the reference, so it
/// carries no payer details or provider ids.
#[derive(Debug, Clone, Serialize)]
pub struct PublicOrder {
    pub reference: OrderReference,
    pub short_code: String,
    pub status: OrderStatus,
    pub provider: PaymentProvider,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<OrderWithLines> for PublicOrder {
    fn from(value: OrderWithLines) -> Self {
        let OrderWithLines { order, lines } = value;
        Self {
            short_code: order.reference.short_code(),
            reference: order.reference,
            status: order.status,
            provider: order.provider,
            currency: order.currency,
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            lines,
            created_at: order.created_at,
            paid_at: order.paid_at,
        }
    }
}

/// A pending order about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub reference: OrderReference,
    pub provider: PaymentProvider,
    pub totals: Totals,
    pub email: Option<Email>,
    pub customer_name: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

/// A line of a pending order, priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub inventory_id: InventoryId,
    pub item_no: String,
    pub name: String,
    pub condition: Condition,
    pub unit_price: Decimal,
    pub qty: i32,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(7),
            reference: OrderReference::generate(),
            status: OrderStatus::Paid,
            provider: PaymentProvider::Stripe,
            currency: "GBP".to_string(),
            subtotal: Decimal::new(1000, 2),
            shipping: Decimal::new(495, 2),
            total: Decimal::new(1495, 2),
            email: Some("buyer@example.com".to_string()),
            customer_name: Some("Buyer".to_string()),
            paypal_order_id: None,
            paypal_capture_id: None,
            stripe_session_id: Some("cs_test_1".to_string()),
            stripe_payment_intent: Some("pi_1".to_string()),
            created_at: Utc::now(),
            paid_at: Some(Utc::now()),
            refunded_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_public_order_hides_payer_and_provider_ids() {
        let public = PublicOrder::from(OrderWithLines {
            order: order(),
            lines: vec![],
        });
        let json = serde_json::to_value(&public).expect("serializes");
        assert!(json.get("email").is_none());
        assert!(json.get("stripe_session_id").is_none());
        assert_eq!(json["status"], "PAID");
        assert!(json["short_code"].as_str().is_some_and(|c| c.starts_with("BH-")));
    }

    #[test]
    fn test_currency_code_parses_stored_value() {
        assert_eq!(order().currency_code(), CurrencyCode::GBP);
    }

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            inventory_id: InventoryId::new(1),
            item_no: "sw0001".to_string(),
            name: "Figure".to_string(),
            condition: Condition::New,
            unit_price: Decimal::new(333, 2),
            qty: 3,
            image_url: None,
        };
        assert_eq!(line.line_total(), Decimal::new(999, 2));
    }
}
