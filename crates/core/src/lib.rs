//! Brickhaus Core - Shared types library.
//!
//! This crate provides the pieces shared by every Brickhaus component:
//! - `storefront` - JSON API, checkout and admin routes
//! - `cli` - BrickLink sync, catalog import and database maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and lets the
//! classifier and cart math be tested without any infrastructure.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, and status enums
//! - [`theme`] - Theme and CMF series classification for catalog items
//! - [`cart`] - Client cart model and order totals
//! - [`catalog`] - Catalog filter parameters and pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod theme;
pub mod types;

pub use types::*;
