//! Per-user cart storage.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use tracing::instrument;

use bramble_core::{CartItem, CartItemId, Product, Quantity, UserId, subtotal};

use crate::db::StoreError;

/// A user's cart: at most one line per product.
///
/// Every operation is scoped to one user; a line id belonging to another user
/// is treated as absent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// All lines in the cart, oldest first.
    async fn list_items(&self, user: UserId) -> Result<Vec<CartItem>, StoreError>;

    /// Add `quantity` of `product`, merging into the existing line if there is one.
    ///
    /// `quantity` is clamped to a minimum of one. Returns the id of the line that
    /// now holds the product.
    async fn add_item(
        &self,
        user: UserId,
        product: &Product,
        quantity: i64,
    ) -> Result<CartItemId, StoreError>;

    /// Set a line's quantity. Fails with `InvalidInput` below one.
    async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        quantity: i64,
    ) -> Result<(), StoreError>;

    /// Delete a line. Deleting a line that does not exist is not an error.
    async fn remove_item(&self, user: UserId, item: CartItemId) -> Result<(), StoreError>;

    /// Delete every line.
    ///
    /// Deletions run concurrently and all of them are awaited. If any fails the
    /// call fails; lines whose deletion landed stay deleted.
    async fn clear(&self, user: UserId) -> Result<(), StoreError> {
        let items = self.list_items(user).await?;
        let results = join_all(items.iter().map(|item| self.remove_item(user, item.id))).await;

        let total = results.len();
        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => Ok(()),
            Some(first) => {
                let failed = 1 + failures.count();
                tracing::warn!(%user, failed, total, error = %first, "cart clear partially failed");
                Err(first)
            }
        }
    }
}

/// Validate a requested line quantity.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` if the value is below one.
pub fn require_quantity(quantity: i64) -> Result<Quantity, StoreError> {
    Quantity::new(quantity).map_err(|e| StoreError::InvalidInput(e.to_string()))
}

/// Parse a line id submitted by a client.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` if the id is missing or malformed.
pub fn require_item_id(raw: Option<&str>) -> Result<CartItemId, StoreError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::InvalidInput("cart item id is required".to_string()))?;
    raw.parse()
        .map_err(|_| StoreError::InvalidInput(format!("invalid cart item id: {raw}")))
}

/// Parse a quantity submitted by a client. Anything but a whole number is rejected.
///
/// # Errors
///
/// Returns `StoreError::InvalidInput` if the value is not an integer of at least one.
pub fn parse_quantity(raw: &str) -> Result<i64, StoreError> {
    let quantity = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::InvalidInput(format!("quantity must be a whole number: {raw}")))?;
    require_quantity(quantity)?;
    Ok(quantity)
}

// =============================================================================
// Optimistic updates
// =============================================================================

/// A local copy of the cart that applies changes before the store confirms them.
///
/// Each mutation snapshots the lines, applies the change locally, then issues
/// the remote call. If that call fails the snapshot is restored and the error
/// is returned for the caller to show.
#[derive(Debug, Clone)]
pub struct OptimisticCart {
    user: UserId,
    items: Vec<CartItem>,
}

impl OptimisticCart {
    /// Load the user's cart from the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the cart cannot be listed.
    pub async fn load(store: &dyn CartStore, user: UserId) -> Result<Self, StoreError> {
        let items = store.list_items(user).await?;
        Ok(Self { user, items })
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        subtotal(&self.items)
    }

    /// Change a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` without touching local state if `quantity` is
    /// below one; otherwise the store's error after rolling back.
    #[instrument(skip(self, store), fields(user_id = %self.user))]
    pub async fn update_quantity(
        &mut self,
        store: &dyn CartStore,
        item: CartItemId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        let new_quantity = require_quantity(quantity)?;
        let snapshot = self.items.clone();

        if let Some(line) = self.items.iter_mut().find(|line| line.id == item) {
            line.quantity = new_quantity;
            line.updated_at = Utc::now();
        }

        self.commit(snapshot, store.update_quantity(self.user, item, quantity).await)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the store's error after rolling back.
    #[instrument(skip(self, store), fields(user_id = %self.user))]
    pub async fn remove(&mut self, store: &dyn CartStore, item: CartItemId) -> Result<(), StoreError> {
        let snapshot = self.items.clone();
        self.items.retain(|line| line.id != item);

        self.commit(snapshot, store.remove_item(self.user, item).await)
    }

    fn commit(
        &mut self,
        snapshot: Vec<CartItem>,
        result: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if let Err(err) = result {
            tracing::warn!(error = %err, "cart mutation failed, restoring previous state");
            self.items = snapshot;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bramble_core::ProductId;
    use mockall::predicate::eq;

    fn line(product: i64, quantity: i64) -> CartItem {
        let now = Utc::now();
        CartItem {
            id: CartItemId::generate(),
            product_id: ProductId::new(product).unwrap(),
            title: format!("Product {product}"),
            price: Decimal::new(1000, 2),
            image: String::new(),
            category: "electronics".to_string(),
            quantity: Quantity::new(quantity).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_require_item_id() {
        assert!(matches!(require_item_id(None), Err(StoreError::InvalidInput(_))));
        assert!(matches!(require_item_id(Some("  ")), Err(StoreError::InvalidInput(_))));
        assert!(matches!(require_item_id(Some("abc")), Err(StoreError::InvalidInput(_))));

        let id = CartItemId::generate();
        assert_eq!(require_item_id(Some(&id.to_string())).unwrap(), id);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(" 3 ").unwrap(), 3);
        for bad in ["0", "-1", "2.5", "NaN", "Infinity", ""] {
            assert!(
                matches!(parse_quantity(bad), Err(StoreError::InvalidInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    /// Forwards the required methods to a mock so `clear` runs its default body.
    struct DefaultClear(MockCartStore);

    #[async_trait]
    impl CartStore for DefaultClear {
        async fn list_items(&self, user: UserId) -> Result<Vec<CartItem>, StoreError> {
            self.0.list_items(user).await
        }

        async fn add_item(
            &self,
            user: UserId,
            product: &Product,
            quantity: i64,
        ) -> Result<CartItemId, StoreError> {
            self.0.add_item(user, product, quantity).await
        }

        async fn update_quantity(
            &self,
            user: UserId,
            item: CartItemId,
            quantity: i64,
        ) -> Result<(), StoreError> {
            self.0.update_quantity(user, item, quantity).await
        }

        async fn remove_item(&self, user: UserId, item: CartItemId) -> Result<(), StoreError> {
            self.0.remove_item(user, item).await
        }
    }

    #[tokio::test]
    async fn test_clear_deletes_every_line() {
        let user = UserId::generate();
        let items = vec![line(1, 1), line(2, 3)];

        let mut store = MockCartStore::new();
        store
            .expect_list_items()
            .with(eq(user))
            .return_once(move |_| Ok(items));
        store.expect_remove_item().times(2).returning(|_, _| Ok(()));

        assert!(DefaultClear(store).clear(user).await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_fails_if_any_delete_fails_but_awaits_all() {
        let user = UserId::generate();
        let items = vec![line(1, 1), line(2, 1), line(3, 1)];
        let failing = items[1].id;

        let mut store = MockCartStore::new();
        store.expect_list_items().return_once(move |_| Ok(items));
        store
            .expect_remove_item()
            .times(3)
            .returning(move |_, item| {
                if item == failing {
                    Err(StoreError::Unavailable("connection reset".to_string()))
                } else {
                    Ok(())
                }
            });

        // times(3) on drop: every deletion ran despite the failure.
        let store = DefaultClear(store);
        assert!(matches!(store.clear(user).await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_optimistic_update_rolls_back_on_failure() {
        let user = UserId::generate();
        let original = line(1, 1);
        let item_id = original.id;

        let mut store = MockCartStore::new();
        store
            .expect_list_items()
            .return_once(move |_| Ok(vec![original]));
        store
            .expect_update_quantity()
            .returning(|_, _, _| Err(StoreError::Unavailable("timeout".to_string())));

        let mut cart = OptimisticCart::load(&store, user).await.unwrap();
        let result = cart.update_quantity(&store, item_id, 5).await;

        assert!(result.is_err());
        assert_eq!(cart.items()[0].quantity.get(), 1);
    }

    #[tokio::test]
    async fn test_optimistic_update_keeps_change_on_success() {
        let user = UserId::generate();
        let original = line(1, 1);
        let item_id = original.id;

        let mut store = MockCartStore::new();
        store
            .expect_list_items()
            .return_once(move |_| Ok(vec![original]));
        store
            .expect_update_quantity()
            .with(eq(user), eq(item_id), eq(3))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut cart = OptimisticCart::load(&store, user).await.unwrap();
        cart.update_quantity(&store, item_id, 3).await.unwrap();

        assert_eq!(cart.items()[0].quantity.get(), 3);
        assert_eq!(cart.subtotal(), Decimal::new(3000, 2));
    }

    #[tokio::test]
    async fn test_optimistic_update_rejects_zero_without_calling_store() {
        let user = UserId::generate();
        let original = line(1, 2);
        let item_id = original.id;

        let mut store = MockCartStore::new();
        store
            .expect_list_items()
            .return_once(move |_| Ok(vec![original]));
        store.expect_update_quantity().never();

        let mut cart = OptimisticCart::load(&store, user).await.unwrap();
        let result = cart.update_quantity(&store, item_id, 0).await;

        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert_eq!(cart.items()[0].quantity.get(), 2);
    }

    #[tokio::test]
    async fn test_optimistic_remove_restores_line_on_failure() {
        let user = UserId::generate();
        let original = line(7, 2);
        let item_id = original.id;

        let mut store = MockCartStore::new();
        store
            .expect_list_items()
            .return_once(move |_| Ok(vec![original]));
        store
            .expect_remove_item()
            .returning(|_, _| Err(StoreError::Unavailable("down".to_string())));

        let mut cart = OptimisticCart::load(&store, user).await.unwrap();
        assert!(cart.remove(&store, item_id).await.is_err());
        assert_eq!(cart.items().len(), 1);
    }
}
