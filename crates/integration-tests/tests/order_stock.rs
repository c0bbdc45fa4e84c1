//! Payment-time stock handling against a real database.
//!
//! These run without a storefront server. They skip when no database URL
//! is configured.

#![allow(clippy::unwrap_used)]

use brickhaus_core::cart::{ShippingPolicy, Totals};
use brickhaus_core::{Condition, CurrencyCode, InventoryId, OrderReference, OrderStatus, PaymentProvider};
use brickhaus_integration_tests::{database, seed_minifig, stock};
use brickhaus_storefront::db::orders::{PaidOutcome, PaymentConfirmation};
use brickhaus_storefront::db::{OrderRepository, ProductRepository};
use brickhaus_storefront::models::{NewOrder, NewOrderLine, Order};
use rust_decimal::Decimal;
use sqlx::PgPool;

const SHIPPING: ShippingPolicy = ShippingPolicy {
    flat_rate: Decimal::from_parts(495, 0, 0, false, 2),
    free_over: None,
};

async fn pending_order(pool: &PgPool, lines: &[(InventoryId, i32)]) -> Order {
    let price = Decimal::new(750, 2);
    let subtotal = lines
        .iter()
        .map(|(_, qty)| price * Decimal::from(*qty))
        .sum();
    let order = NewOrder {
        reference: OrderReference::generate(),
        provider: PaymentProvider::BankTransfer,
        totals: Totals::compute(subtotal, &SHIPPING, CurrencyCode::EUR),
        email: None,
        customer_name: None,
        lines: lines
            .iter()
            .map(|(inventory_id, qty)| NewOrderLine {
                inventory_id: *inventory_id,
                item_no: "col25-3".to_string(),
                name: "Fitness Instructor".to_string(),
                condition: Condition::Used,
                unit_price: price,
                qty: *qty,
                image_url: None,
            })
            .collect(),
    };
    OrderRepository::new(pool).create(&order).await.unwrap()
}

async fn cleanup(pool: &PgPool, ids: &[InventoryId]) {
    for id in ids {
        let _ = ProductRepository::new(pool).delete(*id).await;
    }
}

#[tokio::test]
async fn test_paying_twice_decrements_stock_once() {
    let Some(pool) = database().await else {
        return;
    };
    let id = seed_minifig(&pool, "Fitness Instructor", "col25-3", Decimal::new(750, 2), 5).await;
    let order = pending_order(&pool, &[(id, 2)]).await;
    let orders = OrderRepository::new(&pool);

    let first = orders.mark_paid(order.id, &PaymentConfirmation::default()).await.unwrap();
    match first {
        PaidOutcome::Paid { order, oversold } => {
            assert_eq!(order.status, OrderStatus::Paid);
            assert!(oversold.is_empty());
        }
        PaidOutcome::AlreadyProcessed(_) => panic!("first payment should transition the order"),
    }
    assert_eq!(stock(&pool, id).await, 3);

    let second = orders.mark_paid(order.id, &PaymentConfirmation::default()).await.unwrap();
    match second {
        PaidOutcome::AlreadyProcessed(order) => assert_eq!(order.status, OrderStatus::Paid),
        PaidOutcome::Paid { .. } => panic!("second payment must not transition again"),
    }
    assert_eq!(stock(&pool, id).await, 3);

    cleanup(&pool, &[id]).await;
}

#[tokio::test]
async fn test_concurrent_payments_decrement_stock_once() {
    let Some(pool) = database().await else {
        return;
    };
    let id = seed_minifig(&pool, "Fitness Instructor", "col25-3", Decimal::new(750, 2), 4).await;
    let order = pending_order(&pool, &[(id, 1)]).await;

    let confirmation = PaymentConfirmation::default();
    let orders = OrderRepository::new(&pool);
    let (a, b) = tokio::join!(
        orders.mark_paid(order.id, &confirmation),
        orders.mark_paid(order.id, &confirmation),
    );

    let transitions = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|outcome| matches!(outcome, PaidOutcome::Paid { .. }))
        .count();
    assert_eq!(transitions, 1);
    assert_eq!(stock(&pool, id).await, 3);

    cleanup(&pool, &[id]).await;
}

#[tokio::test]
async fn test_stock_exhausted_before_payment_is_reported_as_oversold() {
    let Some(pool) = database().await else {
        return;
    };
    let scarce = seed_minifig(&pool, "Fitness Instructor", "col25-3", Decimal::new(750, 2), 1).await;
    let plenty = seed_minifig(&pool, "Pizza Costume Guy", "col25-4", Decimal::new(750, 2), 5).await;

    // Both orders were priced while one unit was left.
    let first = pending_order(&pool, &[(scarce, 1)]).await;
    let second = pending_order(&pool, &[(scarce, 1), (plenty, 2)]).await;
    let orders = OrderRepository::new(&pool);

    orders.mark_paid(first.id, &PaymentConfirmation::default()).await.unwrap();
    assert_eq!(stock(&pool, scarce).await, 0);

    match orders.mark_paid(second.id, &PaymentConfirmation::default()).await.unwrap() {
        PaidOutcome::Paid { order, oversold } => {
            assert_eq!(order.status, OrderStatus::Paid);
            assert_eq!(oversold, vec![scarce]);
        }
        PaidOutcome::AlreadyProcessed(_) => panic!("pending order should be paid"),
    }

    assert_eq!(stock(&pool, scarce).await, 0);
    assert_eq!(stock(&pool, plenty).await, 3);

    cleanup(&pool, &[scarce, plenty]).await;
}
