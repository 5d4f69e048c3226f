//! Order lookup command.

use bramble_core::UserId;
use bramble_storefront::db::{PgOrderLedger, StoreError, create_pool};
use bramble_storefront::services::orders::OrderLedger;
use thiserror::Error;

/// Errors that can occur while reading orders.
#[derive(Debug, Error)]
pub enum OrdersError {
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Invalid user id: {0}")]
    InvalidUser(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Print a user's orders, newest first.
///
/// # Errors
///
/// Returns an error if the user id is malformed or the database fails.
pub async fn list(user: &str) -> Result<(), OrdersError> {
    let user: UserId = user
        .parse()
        .map_err(|_| OrdersError::InvalidUser(user.to_owned()))?;
    let database_url = super::database_url().ok_or(OrdersError::MissingDatabaseUrl)?;
    let pool = create_pool(&database_url).await?;

    let orders = PgOrderLedger::new(pool).list_orders(user).await?;
    tracing::info!(%user, count = orders.len(), "Fetched orders");

    #[allow(clippy::print_stdout)]
    for order in &orders {
        println!(
            "{}  {}  {:<6}  {:>10}  {} items",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.status.as_str(),
            order.display_total(),
            order.items.len()
        );
    }
    Ok(())
}
