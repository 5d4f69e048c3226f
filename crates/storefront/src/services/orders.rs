//! Per-user order history.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use bramble_core::{Order, OrderDraft, OrderId, UserId};

use crate::db::StoreError;

/// Append-only ledger of placed orders.
///
/// The ledger records whatever draft it is handed; it never consults the cart.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Record a new order. A missing draft status is stored as `placed`.
    async fn create_order(&self, user: UserId, draft: OrderDraft) -> Result<OrderId, StoreError>;

    /// Every order the user has placed, most recent first.
    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, StoreError>;
}
