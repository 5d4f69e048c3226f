//! Read-only client for the remote product catalog.
//!
//! Talks plain JSON over `reqwest` and caches every response with `moka`
//! for the configured TTL. Payloads are validated into [`Product`] at the
//! boundary; nothing unchecked leaves this module.

mod cache;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use bramble_core::{Product, ProductId};

use crate::config::{CatalogConfig, with_trailing_slash};

use cache::{CacheKey, CacheValue};
use types::{WireProduct, convert_products};

/// Maximum number of cached catalog responses.
const CACHE_CAPACITY: u64 = 1000;

/// Errors from the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog answered with a non-2xx status.
    #[error("catalog request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response did not match the product shape.
    #[error("invalid catalog payload: {0}")]
    InvalidPayload(String),

    /// No product with this id.
    #[error("product {0} not found")]
    NotFound(ProductId),
}

/// Read access to the product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All products.
    async fn products(&self) -> Result<Vec<Product>, CatalogError>;

    /// One product by id.
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Category names.
    async fn categories(&self) -> Result<Vec<String>, CatalogError>;

    /// Products in one category. An empty name yields an empty list.
    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, CatalogError>;
}

// =============================================================================
// CatalogClient
// =============================================================================

/// HTTP client for a Fake Store style catalog API.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                base_url: with_trailing_slash(config.base_url.clone()),
                cache,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| CatalogError::InvalidPayload(format!("invalid catalog path {path}: {e}")))
    }

    /// GET a path and return the body text of a 2xx response.
    async fn get_text(&self, path: &str) -> Result<String, CatalogError> {
        let response = self.inner.client.get(self.endpoint(path)?).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn parse<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, CatalogError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            CatalogError::InvalidPayload(e.to_string())
        })
    }

    async fn fetch_products(&self, key: CacheKey, path: &str) -> Result<Vec<Product>, CatalogError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let body = self.get_text(path).await?;
        let products = convert_products(Self::parse::<Vec<WireProduct>>(path, &body)?)?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        self.fetch_products(CacheKey::Products, "products").await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{id}");
        let body = match self.get_text(&path).await {
            Err(CatalogError::RequestFailed { status: 404, .. }) => {
                return Err(CatalogError::NotFound(id));
            }
            other => other?,
        };

        // Unknown ids usually come back as 200 with an empty body.
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(CatalogError::NotFound(id));
        }

        let product = Product::try_from(Self::parse::<WireProduct>(&path, trimmed)?)?;
        if product.id != id {
            return Err(CatalogError::InvalidPayload(format!(
                "requested product {id}, catalog returned {}",
                product.id
            )));
        }

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let path = "products/categories";
        let body = self.get_text(path).await?;
        let categories: Vec<String> = Self::parse(path, &body)?;

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        if category.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("products/category/{}", urlencoding::encode(category));
        self.fetch_products(CacheKey::Category(category.to_string()), &path)
            .await
    }
}
