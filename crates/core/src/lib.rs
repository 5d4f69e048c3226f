//! Bramble Core - Shared domain types.
//!
//! This crate provides the types shared by every Bramble component:
//! - `storefront` - The customer-facing shop (catalog, cart, checkout, orders)
//! - `cli` - Operator tooling (migrations, catalog browsing, order lookup)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Validation that must hold everywhere (positive product
//! ids, quantities of at least one, non-empty shipping fields) lives here so that
//! an invalid value cannot be constructed in the first place.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, money, products, cart items, orders, emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
