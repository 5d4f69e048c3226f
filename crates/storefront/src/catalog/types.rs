//! Wire shapes returned by the catalog API and their validation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use bramble_core::{Product, ProductId};

use super::CatalogError;

/// A product exactly as the catalog sends it.
///
/// `id`, `title`, `price` and `category` are required. Unknown fields are
/// ignored and a missing image or description becomes empty.
#[derive(Debug, Deserialize)]
pub struct WireProduct {
    pub id: i64,
    pub title: String,
    pub price: serde_json::Number,
    #[serde(default)]
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl TryFrom<WireProduct> for Product {
    type Error = CatalogError;

    fn try_from(wire: WireProduct) -> Result<Self, Self::Error> {
        let id = ProductId::new(wire.id)
            .map_err(|e| CatalogError::InvalidPayload(e.to_string()))?;
        let price = parse_price(&wire.price)?;

        Self::new(
            id,
            wire.title,
            price,
            wire.image,
            wire.category,
            wire.description,
        )
        .map_err(|e| CatalogError::InvalidPayload(format!("product {id}: {e}")))
    }
}

/// Parse a JSON number into an exact decimal using its textual form.
pub fn parse_price(number: &serde_json::Number) -> Result<Decimal, CatalogError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| CatalogError::InvalidPayload(format!("price {text}: {e}")))
}

/// Convert a list of wire products, failing on the first invalid entry.
pub fn convert_products(wire: Vec<WireProduct>) -> Result<Vec<Product>, CatalogError> {
    wire.into_iter().map(Product::try_from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireProduct {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_price_is_exact() {
        let product = Product::try_from(wire(
            r#"{"id":1,"title":"Fjallraven Backpack","price":109.95,"category":"men's clothing",
                "image":"https://fakestoreapi.com/img/81fPKd-2AYL.jpg","description":"Bag",
                "rating":{"rate":3.9,"count":120}}"#,
        ))
        .unwrap();
        assert_eq!(product.price, Decimal::from_str("109.95").unwrap());
        assert_eq!(product.display_price(), "$109.95");
    }

    #[test]
    fn test_integer_price() {
        let product = Product::try_from(wire(
            r#"{"id":2,"title":"Ring","price":168,"category":"jewelery"}"#,
        ))
        .unwrap();
        assert_eq!(product.price, Decimal::from(168));
        assert_eq!(product.image, "");
        assert_eq!(product.description, "");
    }

    #[test]
    fn test_rejects_non_positive_id() {
        let result = Product::try_from(wire(r#"{"id":0,"title":"X","price":1,"category":"c"}"#));
        assert!(matches!(result, Err(CatalogError::InvalidPayload(_))));
    }

    #[test]
    fn test_rejects_negative_price() {
        let result = Product::try_from(wire(r#"{"id":3,"title":"X","price":-1.5,"category":"c"}"#));
        assert!(matches!(result, Err(CatalogError::InvalidPayload(_))));
    }

    #[test]
    fn test_missing_required_field_fails_to_parse() {
        let result = serde_json::from_str::<WireProduct>(r#"{"id":3,"price":1,"category":"c"}"#);
        assert!(result.is_err());
    }
}
