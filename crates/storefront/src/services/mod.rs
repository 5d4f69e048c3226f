//! Business logic services for the storefront.
//!
//! - `cart` - per-user cart storage and optimistic local updates
//! - `orders` - append-only order ledger
//! - `payments` - payment intents and confirmation
//! - `checkout` - cart to order orchestration
//! - `auth` - password sign-up and sign-in
//! - `memory` - in-memory stores, catalog and gateway

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod memory;
pub mod orders;
pub mod payments;
