//! Checkout route handlers.
//!
//! Without payments configured a single form post places the order. With
//! payments the post creates a payment intent and renders the card step; the
//! cart snapshot taken at that point is kept in the session until the shopper
//! confirms, and the order is built from that snapshot.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use tower_sessions::Session;
use tracing::instrument;

use bramble_core::{OrderLine, format_price};

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{CurrentUser, session_keys};
use crate::routes::Nav;
use crate::routes::cart::CartView;
use crate::services::checkout::{CheckoutOutcome, PendingCheckout, ShippingInput};
use crate::state::AppState;

/// Order summary line for the payment step.
#[derive(Debug, Clone)]
pub struct SummaryLine {
    pub title: String,
    pub quantity: u32,
    pub line_price: String,
}

impl From<&OrderLine> for SummaryLine {
    fn from(line: &OrderLine) -> Self {
        Self {
            title: line.title.clone(),
            quantity: line.quantity.get(),
            line_price: format_price(line.price * Decimal::from(line.quantity.get())),
        }
    }
}

/// Checkout page template (summary and shipping form).
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub nav: Nav,
    pub cart: CartView,
    pub shipping: ShippingInput,
    pub requires_payment: bool,
    pub error: Option<String>,
}

/// Card payment step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub nav: Nav,
    pub publishable_key: String,
    pub client_secret: String,
    pub total: String,
    pub lines: Vec<SummaryLine>,
    pub ship_to: String,
}

/// Where to go once an order is recorded.
fn after_order(outcome: CheckoutOutcome) -> Redirect {
    if outcome.cart_cleared {
        Redirect::to("/orders")
    } else {
        Redirect::to("/orders?notice=cart_not_cleared")
    }
}

/// Re-render the checkout form with an error, keeping what the shopper typed.
async fn checkout_with_error(
    state: &AppState,
    user: &CurrentUser,
    shipping: ShippingInput,
    err: AppError,
) -> Response {
    let cart = match state.carts().list_items(user.id).await {
        Ok(items) => CartView::from_items(&items),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload cart for checkout error page");
            CartView::from_items(&[])
        }
    };

    if err.status().is_server_error() {
        tracing::error!(error = %err, "Checkout failed");
    }

    let page = CheckoutTemplate {
        nav: Nav::for_user(Some(user)),
        cart,
        shipping,
        requires_payment: state.checkout().requires_payment(),
        error: Some(err.user_message()),
    };
    (err.status(), page).into_response()
}

/// Display the checkout page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse> {
    let items = state.carts().list_items(user.id).await?;

    Ok(CheckoutTemplate {
        nav: Nav::for_user(Some(&user)),
        cart: CartView::from_items(&items),
        shipping: ShippingInput::default(),
        requires_payment: state.checkout().requires_payment(),
        error: None,
    })
}

/// Handle the shipping form.
#[instrument(skip(state, user, session, shipping), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Form(shipping): Form<ShippingInput>,
) -> Result<Response> {
    let checkout = state.checkout();

    if !checkout.requires_payment() {
        return Ok(match checkout.place_order(user.id, &shipping).await {
            Ok(outcome) => after_order(outcome).into_response(),
            Err(e) => checkout_with_error(&state, &user, shipping, e.into()).await,
        });
    }

    let pending = match checkout.begin_payment(user.id, &shipping).await {
        Ok(pending) => pending,
        Err(e) => return Ok(checkout_with_error(&state, &user, shipping, e.into()).await),
    };

    let payments = state
        .payments()
        .ok_or_else(|| AppError::Internal("payments enabled without a provider".to_string()))?;

    let page = PaymentTemplate {
        nav: Nav::for_user(Some(&user)),
        publishable_key: payments.publishable_key().to_string(),
        client_secret: pending.client_secret.expose_secret().to_string(),
        total: format_price(pending.total),
        lines: pending.items.iter().map(SummaryLine::from).collect(),
        ship_to: format!("{}, {}", pending.shipping.name(), pending.shipping.address()),
    };

    session
        .insert(session_keys::PENDING_CHECKOUT, &pending)
        .await?;

    Ok(page.into_response())
}

/// Finish a card payment: verify it, record the order and empty the cart.
///
/// Also the return URL for payments that needed a redirect.
#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
) -> Result<Response> {
    let pending = session
        .remove::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await?
        .ok_or_else(|| AppError::BadRequest("No payment is in progress.".to_string()))?;

    let shipping = ShippingInput {
        name: pending.shipping.name().to_string(),
        address: pending.shipping.address().to_string(),
        phone: pending.shipping.phone().to_string(),
    };

    Ok(match state.checkout().complete_payment(user.id, pending).await {
        Ok(outcome) => after_order(outcome).into_response(),
        Err(e) => checkout_with_error(&state, &user, shipping, e.into()).await,
    })
}

#[cfg(test)]
mod tests {
    use bramble_core::OrderId;

    use super::*;

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        response
            .headers()
            .get(axum::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_after_order_notice() {
        let order_id = OrderId::generate();
        assert_eq!(
            location(after_order(CheckoutOutcome {
                order_id,
                cart_cleared: true
            })),
            "/orders"
        );
        assert_eq!(
            location(after_order(CheckoutOutcome {
                order_id,
                cart_cleared: false
            })),
            "/orders?notice=cart_not_cleared"
        );
    }
}
