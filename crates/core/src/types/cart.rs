//! Cart line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartItemId, ProductId};
use super::money::format_price;
use super::order::OrderLine;

/// Error returned when a quantity is below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("quantity must be at least 1 (got {0})")]
pub struct QuantityError(pub i64);

/// A line quantity, always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl Quantity {
    /// A quantity of one.
    pub const ONE: Self = Self(1);

    /// Validate a requested quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if `value` is below one or too large to store.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError(value));
        }
        u32::try_from(value)
            .ok()
            .filter(|v| i32::try_from(*v).is_ok())
            .map(Self)
            .ok_or(QuantityError(value))
    }

    /// Clamp a requested quantity to the minimum of one.
    ///
    /// Used when adding to the cart, where a missing or nonsensical amount
    /// means "one more".
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self::new(value.max(1)).unwrap_or(Self(i32::MAX.unsigned_abs()))
    }

    /// Get the quantity.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add two quantities, saturating at the storable maximum.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0).min(i32::MAX.unsigned_abs()))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        Self::from(quantity.0)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line in a user's cart.
///
/// Title, price and image are copied from the product when the line is first
/// created; at most one line exists per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity.get())
    }

    /// Copy this line by value into an order line.
    #[must_use]
    pub fn to_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            title: self.title.clone(),
            price: self.price,
            image: self.image.clone(),
            quantity: self.quantity,
        }
    }

    /// Unit price formatted for display.
    #[must_use]
    pub fn display_price(&self) -> String {
        format_price(self.price)
    }

    /// Line total formatted for display.
    #[must_use]
    pub fn display_line_total(&self) -> String {
        format_price(self.line_total())
    }
}

/// Sum of `price * quantity` over the given lines, in exact decimal arithmetic.
#[must_use]
pub fn subtotal(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}
