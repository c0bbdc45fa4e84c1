//! Status and classification enums for catalog items and orders.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Item condition as listed on BrickLink.
///
/// Serialized as BrickLink's one-letter codes (`"N"` / `"U"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "catalog.item_condition", rename_all = "snake_case")
)]
pub enum Condition {
    #[serde(rename = "N")]
    New,
    #[serde(rename = "U")]
    Used,
}

impl Condition {
    /// BrickLink one-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::New => "N",
            Self::Used => "U",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Used => "Used",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl core::str::FromStr for Condition {
    type Err = String;

    /// Accepts the BrickLink codes as well as the words used in query strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "new" => Ok(Self::New),
            "u" | "used" => Ok(Self::Used),
            other => Err(format!("invalid condition: {other}")),
        }
    }
}

/// BrickLink catalog item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "catalog.item_type", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Minifig,
    Set,
    Part,
    Book,
    Gear,
    Catalog,
    Instruction,
    OriginalBox,
    UnsortedLot,
}

impl ItemType {
    /// The upper-case name used in BrickLink API paths and payloads.
    #[must_use]
    pub const fn api_name(&self) -> &'static str {
        match self {
            Self::Minifig => "MINIFIG",
            Self::Set => "SET",
            Self::Part => "PART",
            Self::Book => "BOOK",
            Self::Gear => "GEAR",
            Self::Catalog => "CATALOG",
            Self::Instruction => "INSTRUCTION",
            Self::OriginalBox => "ORIGINAL_BOX",
            Self::UnsortedLot => "UNSORTED_LOT",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl core::str::FromStr for ItemType {
    type Err = String;

    /// Accepts API names (`MINIFIG`), snake case (`original_box`) and the
    /// one-letter codes used in BrickLink exports (`M`, `S`, `P`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" | "MINIFIG" | "MINIFIGS" => Ok(Self::Minifig),
            "S" | "SET" => Ok(Self::Set),
            "P" | "PART" => Ok(Self::Part),
            "B" | "BOOK" => Ok(Self::Book),
            "G" | "GEAR" => Ok(Self::Gear),
            "C" | "CATALOG" => Ok(Self::Catalog),
            "I" | "INSTRUCTION" => Ok(Self::Instruction),
            "O" | "ORIGINAL_BOX" => Ok(Self::OriginalBox),
            "U" | "UNSORTED_LOT" => Ok(Self::UnsortedLot),
            other => Err(format!("invalid item type: {other}")),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "sales.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created at checkout, waiting for payment.
    #[default]
    Pending,
    /// Payment captured; stock has been decremented.
    Paid,
    /// Payment returned to the customer.
    Refunded,
    /// Abandoned or cancelled before payment.
    Cancelled,
}

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled) | (Self::Paid, Self::Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "REFUNDED" => Ok(Self::Refunded),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            other => Err(format!("invalid order status: {other}")),
        }
    }
}

/// How an order is (to be) paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "sales.payment_provider", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    #[serde(rename = "paypal")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "paypal"))]
    PayPal,
    Stripe,
    BankTransfer,
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayPal => write!(f, "PayPal"),
            Self::Stripe => write!(f, "card (Stripe)"),
            Self::BankTransfer => write!(f, "bank transfer"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_serde_uses_bricklink_codes() {
        assert_eq!(serde_json::to_string(&Condition::New).unwrap(), "\"N\"");
        let used: Condition = serde_json::from_str("\"U\"").unwrap();
        assert_eq!(used, Condition::Used);
    }

    #[test]
    fn test_condition_from_query_words() {
        assert_eq!("new".parse::<Condition>().unwrap(), Condition::New);
        assert_eq!(" U ".parse::<Condition>().unwrap(), Condition::Used);
        assert!("mint".parse::<Condition>().is_err());
    }

    #[test]
    fn test_item_type_codes() {
        assert_eq!("M".parse::<ItemType>().unwrap(), ItemType::Minifig);
        assert_eq!("original_box".parse::<ItemType>().unwrap(), ItemType::OriginalBox);
        assert_eq!(
            serde_json::to_string(&ItemType::OriginalBox).unwrap(),
            "\"ORIGINAL_BOX\""
        );
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Refunded));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Refunded.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn test_payment_provider_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentProvider::PayPal).unwrap(),
            "\"paypal\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentProvider::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
    }
}
