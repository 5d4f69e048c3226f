//! Cart route handlers.
//!
//! Quantity changes and removals go through [`OptimisticCart`]: the page is
//! re-rendered from the rolled-back local copy when the store rejects a change,
//! and a successful change redirects back to the cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bramble_core::{CartItem, ProductId, format_price};

use crate::db::StoreError;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::routes::Nav;
use crate::services::cart::{OptimisticCart, parse_quantity, require_item_id};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: String,
    pub product_id: i64,
    pub title: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.as_i64(),
            title: item.title.clone(),
            image: item.image.clone(),
            quantity: item.quantity.get(),
            price: item.display_price(),
            line_price: item.display_line_total(),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn from_items(items: &[CartItem]) -> Self {
        Self {
            items: items.iter().map(CartItemView::from).collect(),
            subtotal: format_price(bramble_core::subtotal(items)),
            item_count: items.iter().map(|i| i.quantity.get()).sum(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    pub quantity: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: Option<String>,
    #[serde(default)]
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: Option<String>,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub error: Option<String>,
}

/// Render the cart with an error and the status that error maps to.
fn cart_with_error(nav: Nav, items: &[CartItem], err: &AppError) -> Response {
    let page = CartShowTemplate {
        nav,
        cart: CartView::from_items(items),
        error: Some(err.user_message()),
    };
    (err.status(), page).into_response()
}

/// Display cart page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<CartQuery>,
) -> Result<impl IntoResponse> {
    let items = state.carts().list_items(user.id).await?;

    Ok(CartShowTemplate {
        nav: Nav::for_user(Some(&user)),
        cart: CartView::from_items(&items),
        error: query.error,
    })
}

/// Add a product to the cart.
///
/// The line is built from the catalog's copy of the product, not from the form.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let product_id = ProductId::new(form.product_id)
        .map_err(|e| AppError::Store(StoreError::InvalidInput(e.to_string())))?;
    // Anything that is not a number counts as one; the store clamps the rest.
    let quantity = form
        .quantity
        .as_deref()
        .and_then(|q| q.trim().parse::<i64>().ok())
        .unwrap_or(1);

    let product = state.catalog().product(product_id).await?;
    state.carts().add_item(user.id, &product, quantity).await?;

    Ok(Redirect::to("/cart"))
}

/// Change a line's quantity.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = OptimisticCart::load(state.carts(), user.id).await?;
    let nav = Nav::for_user(Some(&user));

    let parsed = require_item_id(form.item_id.as_deref())
        .and_then(|item| parse_quantity(&form.quantity).map(|qty| (item, qty)));
    let (item, quantity) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return Ok(cart_with_error(nav, cart.items(), &AppError::from(e))),
    };

    match cart.update_quantity(state.carts(), item, quantity).await {
        Ok(()) => Ok(Redirect::to("/cart").into_response()),
        Err(e) => Ok(cart_with_error(nav, cart.items(), &AppError::from(e))),
    }
}

/// Remove a line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = OptimisticCart::load(state.carts(), user.id).await?;
    let nav = Nav::for_user(Some(&user));

    let item = match require_item_id(form.item_id.as_deref()) {
        Ok(item) => item,
        Err(e) => return Ok(cart_with_error(nav, cart.items(), &AppError::from(e))),
    };

    match cart.remove(state.carts(), item).await {
        Ok(()) => Ok(Redirect::to("/cart").into_response()),
        Err(e) => Ok(cart_with_error(nav, cart.items(), &AppError::from(e))),
    }
}
