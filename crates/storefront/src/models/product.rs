//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use brickhaus_core::theme;
use brickhaus_core::{Condition, InventoryId, ItemType};

/// A catalog listing (one BrickLink inventory lot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub inventory_id: InventoryId,
    pub item_no: String,
    pub name: String,
    pub item_type: ItemType,
    pub condition: Condition,
    pub price: Decimal,
    pub qty: i32,
    pub image_url: Option<String>,
    pub remarks: Option<String>,
    pub description: Option<String>,
    pub theme: String,
    pub series: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least `qty` units can be sold.
    #[must_use]
    pub fn has_stock(&self, qty: u32) -> bool {
        i64::from(self.qty) >= i64::from(qty)
    }
}

/// A listing joined with its minifigure catalog details, if any were fetched.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EnrichedProduct {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub year_released: Option<i32>,
    pub weight_grams: Option<Decimal>,
}

/// A product as written by sync and import.
///
/// `theme` and `series` are always classifier output; use
/// [`NewProduct::classified`] to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub inventory_id: InventoryId,
    pub item_no: String,
    pub name: String,
    pub item_type: ItemType,
    pub condition: Condition,
    pub price: Decimal,
    pub qty: i32,
    pub image_url: Option<String>,
    pub remarks: Option<String>,
    pub description: Option<String>,
    pub theme: String,
    pub series: Option<i32>,
}

impl NewProduct {
    /// Build a product, deriving theme and series from name and item number.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn classified(
        inventory_id: InventoryId,
        item_no: String,
        name: String,
        item_type: ItemType,
        condition: Condition,
        price: Decimal,
        qty: i32,
    ) -> Self {
        let classification = theme::classify(&name, &item_no);
        Self {
            inventory_id,
            item_no,
            name,
            item_type,
            condition,
            price: brickhaus_core::types::price::round_cents(price),
            qty: qty.max(0),
            image_url: None,
            remarks: None,
            description: None,
            theme: classification.theme.to_string(),
            series: classification.series,
        }
    }
}

/// Minifigure catalog details from the BrickLink catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MinifigDetails {
    pub item_no: String,
    pub name: String,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub year_released: Option<i32>,
    pub weight_grams: Option<Decimal>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Details as written by the enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMinifigDetails {
    pub item_no: String,
    pub name: String,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub year_released: Option<i32>,
    pub weight_grams: Option<Decimal>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classified_derives_theme_and_series() {
        let product = NewProduct::classified(
            InventoryId::new(1),
            "col13-4".to_string(),
            "Egyptian Warrior, Series 13".to_string(),
            ItemType::Minifig,
            Condition::Used,
            Decimal::new(3499, 3),
            -2,
        );
        assert_eq!(product.theme, theme::COLLECTIBLE_MINIFIGURES);
        assert_eq!(product.series, Some(13));
        assert_eq!(product.price, Decimal::new(350, 2));
        assert_eq!(product.qty, 0);
    }
}
