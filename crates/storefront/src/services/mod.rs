//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`checkout`] - Cart validation, provider checkout, finalization, refunds
//! - [`email`] - Order confirmation email

pub mod checkout;
pub mod email;

pub use checkout::{CheckoutError, CheckoutService};
pub use email::EmailService;
