//! Home page route handler.

use axum::response::Redirect;

use crate::session::DEFAULT_LANDING;

/// The storefront opens on the product grid.
pub async fn home() -> Redirect {
    Redirect::to(DEFAULT_LANDING)
}
