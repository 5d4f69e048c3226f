//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use bramble_core::{Order, OrderLine, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::routes::Nav;
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub title: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            title: line.title.clone(),
            image: line.image.clone(),
            quantity: line.quantity.get(),
            price: line.display_price(),
        }
    }
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub placed_on: String,
    pub status: String,
    pub paid: bool,
    pub total: String,
    pub ship_to: String,
    pub lines: Vec<OrderLineView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed_on: order.created_at.format("%b %-d, %Y %H:%M UTC").to_string(),
            status: order.status.to_string(),
            paid: order.status == OrderStatus::Paid,
            total: order.display_total(),
            ship_to: format!("{}, {}", order.shipping.name(), order.shipping.address()),
            lines: order.items.iter().map(OrderLineView::from).collect(),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub nav: Nav,
    pub orders: Vec<OrderView>,
    pub notice: Option<String>,
}

/// Query parameters set by the checkout redirect.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub notice: Option<String>,
}

fn notice_text(code: Option<&str>) -> Option<String> {
    match code? {
        "cart_not_cleared" => Some(
            "Your order was placed, but some items could not be removed from your cart."
                .to_string(),
        ),
        _ => None,
    }
}

/// Display the shopper's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersTemplate> {
    let orders = state.orders().list_orders(user.id).await?;

    Ok(OrdersTemplate {
        nav: Nav::for_user(Some(&user)),
        orders: orders.iter().map(OrderView::from).collect(),
        notice: notice_text(query.notice.as_deref()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use bramble_core::{OrderDraft, OrderId, ProductId, Quantity, ShippingDetails};

    use super::*;

    #[test]
    fn test_order_view() {
        let draft = OrderDraft {
            total: Decimal::new(4495, 2),
            items: vec![OrderLine {
                product_id: ProductId::new(3).unwrap(),
                title: "Mens Cotton Jacket".to_string(),
                price: Decimal::new(4495, 2),
                image: String::new(),
                quantity: Quantity::new(1).unwrap(),
            }],
            shipping: ShippingDetails::new("Ada", "1 Loop Rd", "555-0100").unwrap(),
            payment: None,
            status: Some(OrderStatus::Paid),
        };
        let created_at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        let order = Order::from(draft.into_new_order(OrderId::generate(), created_at));

        let view = OrderView::from(&order);
        assert_eq!(view.placed_on, "Mar 5, 2024 14:07 UTC");
        assert_eq!(view.status, "paid");
        assert!(view.paid);
        assert_eq!(view.total, "$44.95");
        assert_eq!(view.ship_to, "Ada, 1 Loop Rd");
        assert_eq!(view.lines.len(), 1);
    }

    #[test]
    fn test_notice_text() {
        assert!(notice_text(Some("cart_not_cleared")).is_some());
        assert!(notice_text(Some("other")).is_none());
        assert!(notice_text(None).is_none());
    }
}
