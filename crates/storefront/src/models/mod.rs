//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and are serialized straight into API
//! responses; anything that must not leave the server (payer email, provider
//! ids) is stripped by the dedicated view types.

pub mod order;
pub mod product;

pub use order::{NewOrder, NewOrderLine, Order, OrderLine, OrderWithLines, PublicOrder};
pub use product::{EnrichedProduct, MinifigDetails, NewMinifigDetails, NewProduct, Product};
