//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Redirect to the store
//!
//! # Catalog (public)
//! GET  /store                   - Product grid
//! GET  /store/{id}              - Product detail
//! GET  /store/category/{name}   - Products in one category
//!
//! # Cart (requires auth)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add a product
//! POST /cart/update             - Change a line's quantity
//! POST /cart/remove             - Remove a line
//!
//! # Checkout (requires auth)
//! GET  /checkout                - Summary and shipping form
//! POST /checkout                - Place order, or start card payment
//! POST /checkout/confirm        - Finish a card payment (GET for provider redirects)
//!
//! # Orders (requires auth)
//! GET  /orders                  - Order history
//!
//! # Auth
//! GET  /login, POST /login      - Sign in
//! GET  /register, POST /register - Create an account
//! POST /logout                  - Sign out
//!
//! # API
//! POST /api/stripe/create-payment-intent - Create a payment intent
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::models::CurrentUser;
use crate::state::AppState;

/// Header data every page renders.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    /// Email of the signed-in shopper.
    pub email: Option<String>,
}

impl Nav {
    #[must_use]
    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        Self {
            email: user.map(|u| u.email.to_string()),
        }
    }
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(store::index))
        .route("/{id}", get(store::show))
        .route("/category/{name}", get(store::category))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/confirm", get(checkout::confirm).post(checkout::confirm))
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new().route(
        "/stripe/create-payment-intent",
        post(api::payments::create_payment_intent),
    )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/store", store_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/orders", get(orders::index))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .nest("/api", api_routes())
}

/// The storefront application: routes, sessions and request tracing.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
