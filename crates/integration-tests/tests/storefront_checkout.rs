//! Checkout with and without card payments, and the order history it feeds.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use bramble_core::OrderStatus;
use bramble_integration_tests::{TestApp, products, shipping_form};
use bramble_storefront::services::cart::CartStore;
use bramble_storefront::services::orders::OrderLedger;
use bramble_storefront::services::payments::IntentStatus;

// =============================================================================
// Payment-free checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart(
            "ada@example.com",
            &[(products::BACKPACK, 1), (products::T_SHIRT, 2)],
        )
        .await;

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    assert_eq!(response.location(), Some("/orders"));

    let orders = app.orders.list_orders(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Placed);
    assert_eq!(orders[0].display_total(), "$154.55");
    assert_eq!(orders[0].items.len(), 2);
    assert!(orders[0].payment.is_none());
    assert_eq!(orders[0].shipping.name(), "Ada Lovelace");
    assert!(app.carts.list_items(user).await.unwrap().is_empty());

    let page = app.get("/orders", Some(&cookie)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("$154.55"));
    assert!(page.body.contains("Fjallraven Foldsack No. 1 Backpack"));
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let app = TestApp::new();
    let (cookie, user) = app.register("ada@example.com").await;

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Your cart is empty"));
    assert!(app.orders.list_orders(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_shipping_field_is_rejected() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;

    let response = app
        .post_form(
            "/checkout",
            Some(&cookie),
            &[("name", "Ada Lovelace"), ("address", "   "), ("phone", "555-0100")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    // What the shopper typed is kept.
    assert!(response.body.contains("Ada Lovelace"));
    assert!(app.orders.list_orders(user).await.unwrap().is_empty());
    assert_eq!(app.carts.list_items(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_kept_when_cart_cannot_be_cleared() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    app.carts.fail_removals(true);

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/orders?notice=cart_not_cleared"));
    assert_eq!(app.orders.list_orders(user).await.unwrap().len(), 1);

    let page = app
        .get("/orders?notice=cart_not_cleared", Some(&cookie))
        .await;
    assert!(page.body.contains("could not be removed from your cart"));
}

#[tokio::test]
async fn test_order_write_failure_keeps_cart() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    app.orders.fail_writes(true);

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.contains("Could not save your order"));
    assert_eq!(app.carts.list_items(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_orders_are_listed_newest_first() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    app.post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    app.post_form(
        "/cart/add",
        Some(&cookie),
        &[("product_id", &products::T_SHIRT.to_string())],
    )
    .await;
    app.post_form("/checkout", Some(&cookie), &shipping_form())
        .await;

    let orders = app.orders.list_orders(user).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].display_total(), "$22.30");
    assert_eq!(orders[1].display_total(), "$64.00");
}

// =============================================================================
// Card payments
// =============================================================================

#[tokio::test]
async fn test_paid_checkout() {
    let app = TestApp::with_payments();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 2)])
        .await;

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert!(response.body.contains("pi_scripted1_secret_scripted"));
    assert!(response.body.contains("pk_test_bramble"));
    assert!(response.body.contains("$128.00"));
    assert_eq!(app.gateway().intents_created(), 1);
    // Nothing is written until the payment is confirmed.
    assert!(app.orders.list_orders(user).await.unwrap().is_empty());

    let response = app.post_form("/checkout/confirm", Some(&cookie), &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    assert_eq!(response.location(), Some("/orders"));

    let orders = app.orders.list_orders(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Paid);
    assert_eq!(orders[0].display_total(), "$128.00");
    let payment = orders[0].payment.as_ref().unwrap();
    assert_eq!(payment.provider, "scripted");
    assert_eq!(payment.payment_intent_id, "pi_scripted1");
    assert!(app.carts.list_items(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_uses_snapshot_taken_before_payment() {
    let app = TestApp::with_payments();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;

    app.post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    // Added after the payment step started; not part of this order.
    app.post_form(
        "/cart/add",
        Some(&cookie),
        &[("product_id", &products::BACKPACK.to_string())],
    )
    .await;
    app.post_form("/checkout/confirm", Some(&cookie), &[]).await;

    let orders = app.orders.list_orders(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 1);
    assert_eq!(orders[0].display_total(), "$64.00");
}

#[tokio::test]
async fn test_declined_payment_writes_nothing() {
    let app = TestApp::with_payments();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    app.gateway()
        .set_outcome(IntentStatus::RequiresPaymentMethod)
        .await;

    app.post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    let response = app.post_form("/checkout/confirm", Some(&cookie), &[]).await;

    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert!(response.body.contains("Your card was declined."));
    assert!(app.orders.list_orders(user).await.unwrap().is_empty());
    assert_eq!(app.carts.list_items(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_cart_creates_no_payment_intent() {
    let app = TestApp::with_payments();
    let (cookie, _) = app.register("ada@example.com").await;

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.gateway().intents_created(), 0);
}

#[tokio::test]
async fn test_total_below_minimum_charge_is_rejected() {
    let app = TestApp::with_payments();
    let (cookie, _) = app
        .shopper_with_cart("ada@example.com", &[(products::RING, 1)])
        .await;

    let response = app
        .post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("below the minimum"));
    assert_eq!(app.gateway().intents_created(), 0);
}

#[tokio::test]
async fn test_confirm_without_payment_in_progress() {
    let app = TestApp::with_payments();
    let (cookie, _) = app.register("ada@example.com").await;

    let response = app.post_form("/checkout/confirm", Some(&cookie), &[]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("No payment is in progress."));
}

#[tokio::test]
async fn test_paid_order_write_failure_reports_reference() {
    let app = TestApp::with_payments();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;

    app.post_form("/checkout", Some(&cookie), &shipping_form())
        .await;
    app.orders.fail_writes(true);
    let response = app.post_form("/checkout/confirm", Some(&cookie), &[]).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.contains("pi_scripted1"));
    assert_eq!(app.carts.list_items(user).await.unwrap().len(), 1);
}
