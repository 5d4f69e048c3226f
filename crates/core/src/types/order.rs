//! Orders.
//!
//! An order is an immutable snapshot taken at checkout: its lines and total are
//! copied by value from the cart and never reference it afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::Quantity;
use super::id::{OrderId, ProductId};
use super::money::format_price;
use super::status::OrderStatus;

/// A line on a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    pub quantity: Quantity,
}

impl OrderLine {
    /// Unit price formatted for display.
    #[must_use]
    pub fn display_price(&self) -> String {
        format_price(self.price)
    }
}

/// Errors that can occur when validating [`ShippingDetails`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShippingError {
    #[error("name is required")]
    MissingName,
    #[error("address is required")]
    MissingAddress,
    #[error("phone is required")]
    MissingPhone,
}

/// Where an order ships to. Every field is trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawShipping")]
pub struct ShippingDetails {
    name: String,
    address: String,
    phone: String,
}

impl ShippingDetails {
    /// Trim and validate shipping fields.
    ///
    /// # Errors
    ///
    /// Returns the first `ShippingError` found, checking name, address, then phone.
    pub fn new(name: &str, address: &str, phone: &str) -> Result<Self, ShippingError> {
        let name = name.trim();
        let address = address.trim();
        let phone = phone.trim();

        if name.is_empty() {
            return Err(ShippingError::MissingName);
        }
        if address.is_empty() {
            return Err(ShippingError::MissingAddress);
        }
        if phone.is_empty() {
            return Err(ShippingError::MissingPhone);
        }

        Ok(Self {
            name: name.to_owned(),
            address: address.to_owned(),
            phone: phone.to_owned(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }
}

#[derive(Deserialize)]
struct RawShipping {
    name: String,
    address: String,
    phone: String,
}

impl TryFrom<RawShipping> for ShippingDetails {
    type Error = ShippingError;

    fn try_from(raw: RawShipping) -> Result<Self, Self::Error> {
        Self::new(&raw.name, &raw.address, &raw.phone)
    }
}

/// Payment provider reference recorded on a paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub provider: String,
    pub payment_intent_id: String,
}

/// What the checkout hands to the order ledger.
///
/// `status` defaults to [`OrderStatus::Placed`] when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub total: Decimal,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub payment: Option<PaymentRecord>,
    pub status: Option<OrderStatus>,
}

/// A draft with its defaults resolved, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub payment: Option<PaymentRecord>,
}

impl OrderDraft {
    /// Assign an id and creation time, and resolve the default status.
    #[must_use]
    pub fn into_new_order(self, id: OrderId, created_at: DateTime<Utc>) -> NewOrder {
        NewOrder {
            id,
            created_at,
            status: self.status.unwrap_or_default(),
            total: self.total,
            items: self.items,
            shipping: self.shipping,
            payment: self.payment,
        }
    }
}

/// A finalized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub payment: Option<PaymentRecord>,
}

impl Order {
    /// Total formatted for display.
    #[must_use]
    pub fn display_total(&self) -> String {
        format_price(self.total)
    }
}

impl From<NewOrder> for Order {
    fn from(order: NewOrder) -> Self {
        Self {
            id: order.id,
            created_at: order.created_at,
            status: order.status,
            total: order.total,
            items: order.items,
            shipping: order.shipping,
            payment: order.payment,
        }
    }
}
