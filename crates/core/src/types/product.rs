//! Catalog product.
//!
//! Products are owned by the external catalog; the shop only reads them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::format_price;

/// Errors that can occur when validating a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    /// The price is below zero.
    #[error("price must not be negative (got {0})")]
    NegativePrice(Decimal),
    /// The title is empty after trimming.
    #[error("title cannot be empty")]
    EmptyTitle,
}

/// A product as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub description: String,
}

impl Product {
    /// Build a validated product.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the price is negative or the title is blank.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        price: Decimal,
        image: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ProductError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ProductError::EmptyTitle);
        }
        if price < Decimal::ZERO {
            return Err(ProductError::NegativePrice(price));
        }

        Ok(Self {
            id,
            title,
            price,
            image: image.into(),
            category: category.into(),
            description: description.into(),
        })
    }

    /// Price formatted for display.
    #[must_use]
    pub fn display_price(&self) -> String {
        format_price(self.price)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let result = Product::new(
            ProductId::new(1).unwrap(),
            "Backpack",
            Decimal::new(-1, 2),
            "",
            "bags",
            "",
        );
        assert!(matches!(result, Err(ProductError::NegativePrice(_))));
    }

    #[test]
    fn test_blank_title_rejected() {
        let result = Product::new(ProductId::new(1).unwrap(), "  ", Decimal::ONE, "", "", "");
        assert_eq!(result, Err(ProductError::EmptyTitle));
    }

    #[test]
    fn test_display_price() {
        let product = Product::new(
            ProductId::new(1).unwrap(),
            "Backpack",
            Decimal::new(10995, 2),
            "https://img.example/1.png",
            "bags",
            "Fits a laptop",
        )
        .unwrap();
        assert_eq!(product.display_price(), "$109.95");
    }
}
