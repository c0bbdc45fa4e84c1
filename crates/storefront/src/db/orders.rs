//! Order repository.
//!
//! Status changes are single conditional `UPDATE`s on the current status.
//! Whoever wins the row lock performs the transition; concurrent callers
//! see zero affected rows and back off, which is what makes payment
//! confirmation idempotent.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{instrument, warn};

use brickhaus_core::{InventoryId, OrderId, OrderReference, OrderStatus};

use super::products::{decrement_stock, increment_stock};
use super::{RepositoryError, map_constraint};
use crate::models::{NewOrder, Order, OrderLine, OrderWithLines};

const ORDER_COLUMNS: &str = "id, reference, status, provider, currency, subtotal, shipping, \
     total, email, customer_name, paypal_order_id, paypal_capture_id, stripe_session_id, \
     stripe_payment_intent, created_at, paid_at, refunded_at, cancelled_at";

/// Payment details reported by a provider when an order is paid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub paypal_capture_id: Option<String>,
    pub stripe_payment_intent: Option<String>,
    /// Payer email as the provider knows it. Never overwrites one given at checkout.
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Result of trying to mark an order paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaidOutcome {
    /// This call moved the order to PAID and took its lines out of stock.
    /// Lines whose stock ran short in the meantime are listed.
    Paid { order: Order, oversold: Vec<InventoryId> },
    /// The order was not PENDING; nothing changed.
    AlreadyProcessed(Order),
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a PENDING order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate reference and
    /// `RepositoryError::Database` for other failures.
    #[instrument(skip(self, order), fields(reference = %order.reference, provider = ?order.provider))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO sales.order \
                 (reference, status, provider, currency, subtotal, shipping, total, email, customer_name) \
             VALUES ($1, 'pending', $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.reference)
        .bind(order.provider)
        .bind(order.totals.total.currency_code.code())
        .bind(order.totals.subtotal.amount)
        .bind(order.totals.shipping.amount)
        .bind(order.totals.total.amount)
        .bind(order.email.as_ref().map(|e| e.as_str().to_string()))
        .bind(&order.customer_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "order"))?;

        for (position, line) in (0_i32..).zip(&order.lines) {
            sqlx::query(
                r"
                INSERT INTO sales.order_line
                    (order_id, position, inventory_id, item_no, name, condition, unit_price, qty, image_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(line.inventory_id)
            .bind(&line.item_no)
            .bind(&line.name)
            .bind(line.condition)
            .bind(line.unit_price)
            .bind(line.qty)
            .bind(&line.image_url)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_constraint(e, "order line"))?;
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Get an order and its lines by public reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_reference(
        &self,
        reference: OrderReference,
    ) -> Result<Option<OrderWithLines>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;

        match order {
            Some(order) => {
                let lines = self.lines(order.id).await?;
                Ok(Some(OrderWithLines { order, lines }))
            }
            None => Ok(None),
        }
    }

    /// Find the order a `PayPal` order id was created for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_paypal_order(&self, paypal_order_id: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order WHERE paypal_order_id = $1"
        ))
        .bind(paypal_order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Find the order a Stripe Checkout Session was created for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_stripe_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order WHERE stripe_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Lines of an order, in cart order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r"
            SELECT inventory_id, item_no, name, condition, unit_price, qty, image_url
            FROM sales.order_line
            WHERE order_id = $1
            ORDER BY position
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// Orders newest first, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order \
             WHERE ($1::sales.order_status IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Record the `PayPal` order id created for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is already attached to another order.
    pub async fn set_paypal_order_id(&self, id: OrderId, paypal_order_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE sales.order SET paypal_order_id = $2 WHERE id = $1")
            .bind(id)
            .bind(paypal_order_id)
            .execute(self.pool)
            .await
            .map_err(|e| map_constraint(e, "paypal order id"))?;
        Ok(())
    }

    /// Record the Stripe Checkout Session created for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the session is already attached to another order.
    pub async fn set_stripe_session(&self, id: OrderId, session_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE sales.order SET stripe_session_id = $2 WHERE id = $1")
            .bind(id)
            .bind(session_id)
            .execute(self.pool)
            .await
            .map_err(|e| map_constraint(e, "stripe session id"))?;
        Ok(())
    }

    /// Move an order from PENDING to PAID and take its lines out of stock.
    ///
    /// Runs in one transaction. Stock decrements are guarded; a line whose
    /// stock ran out since checkout is reported as oversold instead of
    /// failing the payment, since the money has already moved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self, confirmation))]
    pub async fn mark_paid(
        &self,
        id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<PaidOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Order>(&format!(
            "UPDATE sales.order SET \
                 status = 'paid', paid_at = now(), \
                 paypal_capture_id = COALESCE($2, paypal_capture_id), \
                 stripe_payment_intent = COALESCE($3, stripe_payment_intent), \
                 email = COALESCE(email, $4), \
                 customer_name = COALESCE(customer_name, $5) \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(&confirmation.paypal_capture_id)
        .bind(&confirmation.stripe_payment_intent)
        .bind(&confirmation.email)
        .bind(&confirmation.name)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = updated else {
            tx.rollback().await?;
            let current = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
            return Ok(PaidOutcome::AlreadyProcessed(current));
        };

        let mut oversold = Vec::new();
        for (inventory_id, qty) in line_quantities(&mut tx, id).await? {
            if !decrement_stock(&mut tx, inventory_id, qty).await? {
                warn!(order = %order.reference, %inventory_id, qty, "Stock ran short for paid order");
                oversold.push(inventory_id);
            }
        }

        tx.commit().await?;
        Ok(PaidOutcome::Paid { order, oversold })
    }

    /// Move an order from PAID to REFUNDED, optionally returning its lines to stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is not PAID.
    #[instrument(skip(self))]
    pub async fn mark_refunded(&self, id: OrderId, restock: bool) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = transition(&mut tx, id, OrderStatus::Paid, OrderStatus::Refunded)
            .await?
            .ok_or_else(|| RepositoryError::Conflict("order is not paid".to_string()))?;

        if restock {
            for (inventory_id, qty) in line_quantities(&mut tx, id).await? {
                if !increment_stock(&mut tx, inventory_id, qty).await? {
                    warn!(order = %order.reference, %inventory_id, "Refunded line's product no longer exists");
                }
            }
        }

        tx.commit().await?;
        Ok(order)
    }

    /// Move an order from PENDING to CANCELLED.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is not PENDING.
    pub async fn cancel(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = transition(&mut tx, id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await?
            .ok_or_else(|| RepositoryError::Conflict("order is not pending".to_string()))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }
}

/// Conditionally move an order between statuses, stamping the matching timestamp.
///
/// Returns `None` if the order was not in `from`.
async fn transition(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Option<Order>, RepositoryError> {
    debug_assert!(from.can_transition_to(to));
    let stamp = match to {
        OrderStatus::Paid => "paid_at",
        OrderStatus::Refunded => "refunded_at",
        OrderStatus::Cancelled => "cancelled_at",
        OrderStatus::Pending => {
            return Err(RepositoryError::Conflict(
                "orders cannot return to pending".to_string(),
            ));
        }
    };

    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE sales.order SET status = $3, {stamp} = now() \
         WHERE id = $1 AND status = $2 \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(order)
}

async fn line_quantities(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
) -> Result<Vec<(InventoryId, i32)>, RepositoryError> {
    let rows = sqlx::query_as::<_, (InventoryId, i32)>(
        "SELECT inventory_id, qty FROM sales.order_line WHERE order_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}
