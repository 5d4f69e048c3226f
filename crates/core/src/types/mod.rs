//! Core types for Bramble.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod status;

pub use cart::{CartItem, Quantity, QuantityError, subtotal};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CURRENCY, MINIMUM_CHARGE, MinorUnits, format_price, round_to_cents};
pub use order::{
    NewOrder, Order, OrderDraft, OrderLine, PaymentRecord, ShippingDetails, ShippingError,
};
pub use product::{Product, ProductError};
pub use status::OrderStatus;
