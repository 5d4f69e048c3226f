//! Catalog route handlers.
//!
//! The store is public; adding to the cart needs a signed-in shopper.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use bramble_core::{Product, ProductId};

use crate::catalog::CatalogError;
use crate::error::{AppError, Result};
use crate::middleware::OptionalUser;
use crate::routes::Nav;
use crate::session::login_redirect;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i64,
    pub title: String,
    pub price: String,
    pub image: String,
    pub category: String,
    pub description: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            title: product.title.clone(),
            price: product.display_price(),
            image: product.image.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
        }
    }
}

/// Category filter link.
#[derive(Debug, Clone)]
pub struct CategoryLink {
    pub name: String,
    pub href: String,
    pub active: bool,
}

/// Product grid template.
#[derive(Template, WebTemplate)]
#[template(path = "store/index.html")]
pub struct StoreIndexTemplate {
    pub nav: Nav,
    pub heading: String,
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryLink>,
    pub error: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "store/show.html")]
pub struct ProductShowTemplate {
    pub nav: Nav,
    pub product: ProductView,
    /// Where an anonymous shopper signs in before adding to the cart.
    pub login_url: String,
}

fn category_href(name: &str) -> String {
    format!("/store/category/{}", urlencoding::encode(name))
}

/// Category links, or none if the catalog cannot list them.
async fn category_links(state: &AppState, active: Option<&str>) -> Vec<CategoryLink> {
    match state.catalog().categories().await {
        Ok(names) => names
            .into_iter()
            .map(|name| CategoryLink {
                href: category_href(&name),
                active: active == Some(name.as_str()),
                name,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories");
            Vec::new()
        }
    }
}

/// Render the grid, or the grid's error state with a retry link.
fn grid(
    nav: Nav,
    heading: String,
    categories: Vec<CategoryLink>,
    products: std::result::Result<Vec<Product>, CatalogError>,
) -> Response {
    match products {
        Ok(products) => StoreIndexTemplate {
            nav,
            heading,
            products: products.iter().map(ProductView::from).collect(),
            categories,
            error: None,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            let err = AppError::from(e);
            let page = StoreIndexTemplate {
                nav,
                heading,
                products: Vec::new(),
                categories,
                error: Some(err.user_message()),
            };
            (err.status(), page).into_response()
        }
    }
}

/// Display all products.
#[instrument(skip(state, user))]
pub async fn index(State(state): State<AppState>, OptionalUser(user): OptionalUser) -> Response {
    let nav = Nav::for_user(user.as_ref());
    let categories = category_links(&state, None).await;
    let products = state.catalog().products().await;

    grid(nav, "All products".to_string(), categories, products)
}

/// Display the products in one category.
#[instrument(skip(state, user))]
pub async fn category(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(name): Path<String>,
) -> Response {
    let nav = Nav::for_user(user.as_ref());
    let categories = category_links(&state, Some(&name)).await;
    let products = state.catalog().products_in_category(&name).await;

    grid(nav, name, categories, products)
}

/// Display one product.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = raw_id
        .parse::<i64>()
        .ok()
        .and_then(|n| ProductId::new(n).ok())
        .ok_or_else(|| AppError::NotFound(format!("product {raw_id}")))?;

    let product = state.catalog().product(id).await?;

    Ok(ProductShowTemplate {
        nav: Nav::for_user(user.as_ref()),
        login_url: login_redirect(&format!("/store/{id}")),
        product: ProductView::from(&product),
    })
}
