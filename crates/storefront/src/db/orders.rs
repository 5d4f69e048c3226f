//! Order repository for database operations.
//!
//! Orders are written once and never updated. Lines, shipping and payment are
//! stored as JSONB snapshots so later catalog or cart changes cannot touch them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as};
use tracing::instrument;

use bramble_core::{
    Order, OrderDraft, OrderId, OrderLine, OrderStatus, PaymentRecord, ShippingDetails, UserId,
};

use super::StoreError;
use crate::services::orders::OrderLedger;

const INSERT_ORDER_SQL: &str = r#"
    INSERT INTO storefront."order"
        (id, user_id, created_at, status, total, items, shipping, payment)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

const LIST_ORDERS_SQL: &str = r#"
    SELECT id, created_at, status, total, items, shipping, payment
    FROM storefront."order"
    WHERE user_id = $1
    ORDER BY created_at DESC, id DESC
"#;

struct OrderRow {
    id: OrderId,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    total: Decimal,
    items: Json<Vec<OrderLine>>,
    shipping: Json<ShippingDetails>,
    payment: Option<Json<PaymentRecord>>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            status: row.try_get("status")?,
            total: row.try_get("total")?,
            items: row.try_get("items")?,
            shipping: row.try_get("shipping")?,
            payment: row.try_get("payment")?,
        })
    }
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            status: row.status,
            total: row.total,
            items: row.items.0,
            shipping: row.shipping.0,
            payment: row.payment.map(|p| p.0),
        }
    }
}

/// Order ledger backed by `storefront.order`.
#[derive(Clone)]
pub struct PgOrderLedger {
    pool: PgPool,
}

impl PgOrderLedger {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    #[instrument(skip(self, draft), fields(user_id = %user, lines = draft.items.len()))]
    async fn create_order(&self, user: UserId, draft: OrderDraft) -> Result<OrderId, StoreError> {
        let order = draft.into_new_order(OrderId::generate(), Utc::now());

        query(INSERT_ORDER_SQL)
            .bind(order.id)
            .bind(user)
            .bind(order.created_at)
            .bind(order.status)
            .bind(order.total)
            .bind(Json(&order.items))
            .bind(Json(&order.shipping))
            .bind(order.payment.as_ref().map(Json))
            .execute(&self.pool)
            .await?;

        tracing::info!(order_id = %order.id, status = %order.status, "order recorded");
        Ok(order.id)
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = query_as::<Postgres, OrderRow>(LIST_ORDERS_SQL)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }
}
