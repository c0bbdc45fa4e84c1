//! Brickhaus storefront library.
//!
//! The JSON API, checkout and admin routes, plus the BrickLink client and
//! repositories shared with `bh-cli`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bricklink;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
