//! Catalog browsing commands.
//!
//! Talks to the same remote catalog the storefront uses, configured with
//! `CATALOG_BASE_URL`.

use bramble_core::Product;
use bramble_storefront::catalog::{Catalog, CatalogClient, CatalogError};
use bramble_storefront::config::{CatalogConfig, ConfigError};
use thiserror::Error;

/// Errors that can occur while reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogCommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn client() -> Result<CatalogClient, CatalogCommandError> {
    Ok(CatalogClient::new(&CatalogConfig::from_env()?))
}

/// One product per line: id, price, category, title.
fn product_line(product: &Product) -> String {
    format!(
        "{:>4}  {:>10}  {:<20}  {}",
        product.id.as_i64(),
        product.display_price(),
        product.category,
        product.title
    )
}

/// List products, optionally limited to one category.
///
/// # Errors
///
/// Returns an error if the catalog cannot be reached or returns bad data.
pub async fn products(category: Option<&str>) -> Result<(), CatalogCommandError> {
    let client = client()?;
    let products = match category {
        Some(category) => client.products_in_category(category).await?,
        None => client.products().await?,
    };

    tracing::info!(count = products.len(), "Fetched products");
    #[allow(clippy::print_stdout)]
    for product in &products {
        println!("{}", product_line(product));
    }
    Ok(())
}

/// List category names.
///
/// # Errors
///
/// Returns an error if the catalog cannot be reached or returns bad data.
pub async fn categories() -> Result<(), CatalogCommandError> {
    let categories = client()?.categories().await?;

    #[allow(clippy::print_stdout)]
    for name in &categories {
        println!("{name}");
    }
    Ok(())
}
