//! Client cart model and order totals.
//!
//! The cart lives in the browser until checkout, so the server only ever
//! sees it as a JSON body. The same type is used on both sides of that
//! boundary: the storefront deserializes it, reprices every line from the
//! catalog, and computes [`Totals`] with a [`ShippingPolicy`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::price::round_cents;
use crate::types::{CurrencyCode, InventoryId, Price};

/// Upper bound on the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// One line in a client cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// BrickLink inventory ID of the listing.
    pub sku: InventoryId,
    pub name: String,
    /// Unit price as the client last saw it. Never trusted at checkout.
    pub price: Decimal,
    pub qty: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartItem {
    /// Line total (`price * qty`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        round_cents(self.price * Decimal::from(self.qty))
    }
}

/// A client cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item, merging with an existing line for the same sku.
    ///
    /// The merged quantity is capped at [`MAX_LINE_QUANTITY`]; a zero
    /// quantity is a no-op.
    pub fn add(&mut self, item: CartItem) {
        if item.qty == 0 {
            return;
        }

        if let Some(existing) = self.items.iter_mut().find(|line| line.sku == item.sku) {
            existing.qty = existing
                .qty
                .saturating_add(item.qty)
                .min(MAX_LINE_QUANTITY);
            existing.price = item.price;
            existing.name = item.name;
            if item.image_url.is_some() {
                existing.image_url = item.image_url;
            }
        } else {
            let mut item = item;
            item.qty = item.qty.min(MAX_LINE_QUANTITY);
            self.items.push(item);
        }
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// Returns `false` if the sku is not in the cart.
    pub fn set_quantity(&mut self, sku: InventoryId, qty: u32) -> bool {
        if qty == 0 {
            return self.remove(sku);
        }

        match self.items.iter_mut().find(|line| line.sku == sku) {
            Some(line) => {
                line.qty = qty.min(MAX_LINE_QUANTITY);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if the sku is not in the cart.
    pub fn remove(&mut self, sku: InventoryId) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.sku != sku);
        self.items.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.qty).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Collapse duplicate skus into single lines (summing quantities) and
    /// drop zero-quantity lines. Carts posted by clients are normalized
    /// before validation.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut cart = Self::new();
        for item in self.items {
            cart.add(item);
        }
        cart
    }
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_rate: Decimal,
    /// Subtotals at or above this amount ship free. `None` disables free shipping.
    pub free_over: Option<Decimal>,
}

impl ShippingPolicy {
    /// Shipping charged for a subtotal. Empty carts ship for nothing.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self.free_over {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.flat_rate,
        }
    }
}

/// Order totals in a single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

impl Totals {
    /// Compute totals from a subtotal and a shipping policy.
    #[must_use]
    pub fn compute(subtotal: Decimal, policy: &ShippingPolicy, currency: CurrencyCode) -> Self {
        let subtotal = round_cents(subtotal);
        let shipping = round_cents(policy.shipping_for(subtotal));
        Self {
            subtotal: Price::new(subtotal, currency),
            shipping: Price::new(shipping, currency),
            total: Price::new(subtotal + shipping, currency),
        }
    }
}
