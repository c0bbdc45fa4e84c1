//! BrickLink Store API payloads and their mapping onto catalog rows.

use rust_decimal::Decimal;
use serde::Deserialize;

use brickhaus_core::{Condition, InventoryId, ItemType};

use super::BrickLinkError;
use crate::models::{NewMinifigDetails, NewProduct};

/// Response envelope wrapping every BrickLink API payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
}

impl Meta {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning a non-2xx meta code into an error.
    ///
    /// # Errors
    ///
    /// Returns `BrickLinkError::Api` for an error meta and
    /// `BrickLinkError::Parse` if a successful response carries no data.
    pub fn into_data(self) -> Result<T, BrickLinkError> {
        if !self.meta.is_success() {
            return Err(BrickLinkError::Api {
                code: self.meta.code,
                message: self.meta.message,
                description: self.meta.description,
            });
        }
        self.data
            .ok_or_else(|| BrickLinkError::Parse("response has no data".to_string()))
    }
}

/// The catalog item an inventory lot refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRef {
    pub no: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub category_id: Option<i32>,
}

/// One store inventory lot.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItem {
    pub inventory_id: i64,
    pub item: ItemRef,
    #[serde(default)]
    pub color_id: i32,
    pub quantity: i32,
    /// `N` or `U`.
    pub new_or_used: String,
    /// Fixed-point string with four decimals (`"2.5000"`).
    pub unit_price: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub is_stock_room: bool,
}

/// A catalog item (`GET /items/{type}/{no}`).
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub no: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub category_id: Option<i32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Grams, as a decimal string.
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub year_released: Option<i32>,
}

/// A catalog category (`GET /categories/{id}`).
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub category_id: i32,
    pub category_name: String,
    #[serde(default)]
    pub parent_id: i32,
}

impl InventoryItem {
    /// Whether the lot is for sale. Stockroom lots are hidden from buyers.
    #[must_use]
    pub const fn is_listable(&self) -> bool {
        !self.is_stock_room
    }

    #[must_use]
    pub fn is_minifig(&self) -> bool {
        self.item.item_type.eq_ignore_ascii_case("MINIFIG")
    }

    /// Map the lot onto a catalog row, classifying theme and series.
    ///
    /// # Errors
    ///
    /// Returns `BrickLinkError::InvalidItem` if the type, condition or price
    /// cannot be understood.
    pub fn to_new_product(&self) -> Result<NewProduct, BrickLinkError> {
        let invalid = |what: String| BrickLinkError::InvalidItem {
            inventory_id: self.inventory_id,
            reason: what,
        };

        let item_type: ItemType = self.item.item_type.parse().map_err(invalid)?;
        let condition: Condition = self.new_or_used.parse().map_err(invalid)?;
        let price: Decimal = self
            .unit_price
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid unit price: {}", self.unit_price)))?;

        let mut product = NewProduct::classified(
            InventoryId::new(self.inventory_id),
            self.item.no.clone(),
            decode_entities(&self.item.name),
            item_type,
            condition,
            price,
            self.quantity,
        );
        product.image_url = Some(image_url(item_type, &self.item.no, self.color_id));
        product.remarks = non_empty(self.remarks.as_deref());
        product.description = non_empty(self.description.as_deref()).map(|d| decode_entities(&d));
        Ok(product)
    }
}

impl CatalogItem {
    /// Map onto an enrichment row, given the already resolved category name.
    #[must_use]
    pub fn to_minifig_details(&self, category_name: Option<String>) -> NewMinifigDetails {
        NewMinifigDetails {
            item_no: self.no.clone(),
            name: decode_entities(&self.name),
            category_id: self.category_id,
            category_name,
            year_released: self.year_released.filter(|year| *year > 0),
            weight_grams: self
                .weight
                .as_deref()
                .and_then(|w| w.trim().parse::<Decimal>().ok())
                .filter(|w| !w.is_zero()),
            image_url: self.image_url.as_deref().map(absolute_url),
            thumbnail_url: self.thumbnail_url.as_deref().map(absolute_url),
        }
    }
}

/// BrickLink's image CDN URL for an item.
///
/// Parts are imaged per colour; everything else uses colour 0.
#[must_use]
pub fn image_url(item_type: ItemType, item_no: &str, color_id: i32) -> String {
    let (code, color) = match item_type {
        ItemType::Minifig => ("MN", 0),
        ItemType::Set => ("SN", 0),
        ItemType::Part => ("PN", color_id),
        ItemType::Book => ("BN", 0),
        ItemType::Gear => ("GN", 0),
        ItemType::Catalog => ("CN", 0),
        ItemType::Instruction => ("IN", 0),
        ItemType::OriginalBox => ("ON", 0),
        ItemType::UnsortedLot => ("UN", 0),
    };
    format!("https://img.bricklink.com/ItemImage/{code}/{color}/{item_no}.png")
}

/// BrickLink returns protocol-relative image URLs (`//img.bricklink.com/...`).
fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

/// Names come back HTML-escaped (`Batman&#39;s Cape`).
fn decode_entities(s: &str) -> String {
    s.replace("&#40;", "(")
        .replace("&#41;", ")")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// A BrickLink inventory export: either the bare array or a full API envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InventoryExport {
    Envelope(Envelope<Vec<InventoryItem>>),
    Items(Vec<InventoryItem>),
}

/// Parse a saved inventory export.
///
/// # Errors
///
/// Returns `BrickLinkError::Parse` if the JSON matches neither shape, or
/// `BrickLinkError::Api` if it is an error envelope.
pub fn parse_inventory_export(json: &[u8]) -> Result<Vec<InventoryItem>, BrickLinkError> {
    let export: InventoryExport =
        serde_json::from_slice(json).map_err(|e| BrickLinkError::Parse(e.to_string()))?;
    match export {
        InventoryExport::Envelope(envelope) => envelope.into_data(),
        InventoryExport::Items(items) => Ok(items),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brickhaus_core::theme;

    use super::*;

    const LOT: &str = r#"{
        "inventory_id": 50592684,
        "item": {"no": "sw0187", "name": "Clone Trooper &#40;Phase 2&#41;", "type": "MINIFIG", "category_id": 65},
        "color_id": 0,
        "color_name": "(Not Applicable)",
        "quantity": 3,
        "new_or_used": "U",
        "completeness": "C",
        "unit_price": "4.5000",
        "description": "",
        "remarks": " A12 ",
        "is_stock_room": false
    }"#;

    #[test]
    fn test_inventory_lot_to_product() {
        let lot: InventoryItem = serde_json::from_str(LOT).unwrap();
        assert!(lot.is_listable());
        assert!(lot.is_minifig());

        let product = lot.to_new_product().unwrap();
        assert_eq!(product.inventory_id, InventoryId::new(50_592_684));
        assert_eq!(product.name, "Clone Trooper (Phase 2)");
        assert_eq!(product.item_type, ItemType::Minifig);
        assert_eq!(product.condition, Condition::Used);
        assert_eq!(product.price, Decimal::new(450, 2));
        assert_eq!(product.qty, 3);
        assert_eq!(product.theme, "Star Wars");
        assert_eq!(product.remarks.as_deref(), Some("A12"));
        assert_eq!(product.description, None);
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://img.bricklink.com/ItemImage/MN/0/sw0187.png")
        );
    }

    #[test]
    fn test_invalid_condition_is_reported() {
        let mut lot: InventoryItem = serde_json::from_str(LOT).unwrap();
        lot.new_or_used = "X".to_string();
        assert!(matches!(
            lot.to_new_product(),
            Err(BrickLinkError::InvalidItem { inventory_id: 50_592_684, .. })
        ));
    }

    #[test]
    fn test_envelope_error_meta() {
        let json = r#"{"meta":{"code":401,"message":"BAD_OAUTH_REQUEST","description":"SIGNATURE_INVALID"},"data":{}}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        match envelope.into_data() {
            Err(BrickLinkError::Api { code, message, .. }) => {
                assert_eq!(code, 401);
                assert_eq!(message, "BAD_OAUTH_REQUEST");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_export_accepts_both_shapes() {
        let bare = format!("[{LOT}]");
        assert_eq!(parse_inventory_export(bare.as_bytes()).unwrap().len(), 1);

        let wrapped = format!(r#"{{"meta":{{"code":200,"message":"OK","description":"OK"}},"data":[{LOT}]}}"#);
        assert_eq!(parse_inventory_export(wrapped.as_bytes()).unwrap().len(), 1);

        assert!(parse_inventory_export(b"{\"nope\":1}").is_err());
    }

    #[test]
    fn test_catalog_item_to_details() {
        let json = r#"{
            "no": "col13-4", "name": "Egyptian Warrior, Series 13", "type": "MINIFIG",
            "category_id": 746, "image_url": "//img.bricklink.com/ItemImage/MN/0/col13-4.png",
            "thumbnail_url": "//img.bricklink.com/ItemImage/MT/0/col13-4.t1.png",
            "weight": "3.50", "year_released": 2015
        }"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        let details = item.to_minifig_details(Some("Collectible Minifigures / Series 13".to_string()));
        assert_eq!(details.weight_grams, Some(Decimal::new(350, 2)));
        assert_eq!(details.year_released, Some(2015));
        assert_eq!(
            details.image_url.as_deref(),
            Some("https://img.bricklink.com/ItemImage/MN/0/col13-4.png")
        );
        assert_eq!(theme::cmf_series(&details.name, &details.item_no), Some(13));
    }

    #[test]
    fn test_part_images_use_color() {
        assert_eq!(
            image_url(ItemType::Part, "3001", 5),
            "https://img.bricklink.com/ItemImage/PN/5/3001.png"
        );
    }
}
