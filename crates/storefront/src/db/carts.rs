//! Cart repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};
use tracing::instrument;

use bramble_core::{CartItem, CartItemId, Product, ProductId, Quantity, UserId};

use super::StoreError;
use crate::services::cart::{CartStore, require_quantity};

const LIST_ITEMS_SQL: &str = r"
    SELECT id, product_id, title, price, image, category, quantity, created_at, updated_at
    FROM storefront.cart_item
    WHERE user_id = $1
    ORDER BY created_at, id
";

// Merge on (user_id, product_id) so two adds of one product never make two rows.
// The merged quantity saturates at the int4 maximum, as `Quantity::saturating_add` does.
const UPSERT_ITEM_SQL: &str = r"
    INSERT INTO storefront.cart_item
        (id, user_id, product_id, title, price, image, category, quantity)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (user_id, product_id) DO UPDATE
        SET quantity = LEAST(
                storefront.cart_item.quantity::bigint + EXCLUDED.quantity,
                2147483647
            )::integer,
            updated_at = now()
    RETURNING id
";

const UPDATE_QUANTITY_SQL: &str = r"
    UPDATE storefront.cart_item
    SET quantity = $3, updated_at = now()
    WHERE id = $1 AND user_id = $2
";

const DELETE_ITEM_SQL: &str = r"
    DELETE FROM storefront.cart_item
    WHERE id = $1 AND user_id = $2
";

/// Row shape of `storefront.cart_item`.
struct CartItemRow {
    id: CartItemId,
    product_id: ProductId,
    title: String,
    price: Decimal,
    image: String,
    category: String,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            title: row.try_get("title")?,
            price: row.try_get("price")?,
            image: row.try_get("image")?,
            category: row.try_get("category")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            StoreError::DataCorruption(format!("cart item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            title: row.title,
            price: row.price,
            image: row.image,
            category: row.category,
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Cart store backed by `storefront.cart_item`.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_db_quantity(quantity: Quantity) -> Result<i32, StoreError> {
    i32::try_from(quantity.get())
        .map_err(|_| StoreError::InvalidInput(format!("quantity too large: {}", quantity.get())))
}

#[async_trait]
impl CartStore for PgCartStore {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn list_items(&self, user: UserId) -> Result<Vec<CartItem>, StoreError> {
        let rows = query_as::<Postgres, CartItemRow>(LIST_ITEMS_SQL)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    #[instrument(skip(self, product), fields(user_id = %user, product_id = %product.id))]
    async fn add_item(
        &self,
        user: UserId,
        product: &Product,
        quantity: i64,
    ) -> Result<CartItemId, StoreError> {
        let quantity = to_db_quantity(Quantity::clamped(quantity))?;

        let id = query_scalar::<Postgres, CartItemId>(UPSERT_ITEM_SQL)
            .bind(CartItemId::generate())
            .bind(user)
            .bind(product.id)
            .bind(&product.title)
            .bind(product.price)
            .bind(&product.image)
            .bind(&product.category)
            .bind(quantity)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        let quantity = to_db_quantity(require_quantity(quantity)?)?;

        let updated = query(UPDATE_QUANTITY_SQL)
            .bind(item)
            .bind(user)
            .bind(quantity)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            tracing::debug!(%item, "quantity update matched no cart item");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn remove_item(&self, user: UserId, item: CartItemId) -> Result<(), StoreError> {
        query(DELETE_ITEM_SQL)
            .bind(item)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
