//! Cart pages: adding, merging, quantity changes and removal.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;

use bramble_integration_tests::{TestApp, products};
use bramble_storefront::services::cart::CartStore;

#[tokio::test]
async fn test_adding_same_product_twice_merges_lines() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::BACKPACK, 1), (products::BACKPACK, 1)])
        .await;

    let items = app.carts.list_items(user).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity.get(), 2);

    let response = app.get("/cart", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("$219.90"));
}

#[tokio::test]
async fn test_add_clamps_quantity_and_copies_catalog_data() {
    let app = TestApp::new();
    let (cookie, user) = app.register("ada@example.com").await;

    let response = app
        .post_form(
            "/cart/add",
            Some(&cookie),
            &[("product_id", "2"), ("quantity", "-4")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/cart"));

    let items = app.carts.list_items(user).await.unwrap();
    assert_eq!(items[0].quantity.get(), 1);
    assert_eq!(items[0].title, "Mens Casual Premium Slim Fit T-Shirts");
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let app = TestApp::new();
    let (cookie, user) = app.register("ada@example.com").await;

    let response = app
        .post_form("/cart/add", Some(&cookie), &[("product_id", "404")])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(app.carts.list_items(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_quantity() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    let before = app.carts.list_items(user).await.unwrap()[0].clone();
    let item = before.id.to_string();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let response = app
        .post_form(
            "/cart/update",
            Some(&cookie),
            &[("item_id", &item), ("quantity", "3")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let items = app.carts.list_items(user).await.unwrap();
    assert_eq!(items[0].quantity.get(), 3);
    assert!(items[0].updated_at > before.updated_at);
}

#[tokio::test]
async fn test_update_to_zero_is_rejected_and_cart_unchanged() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 2)])
        .await;
    let item = app.carts.list_items(user).await.unwrap()[0].id.to_string();

    let response = app
        .post_form(
            "/cart/update",
            Some(&cookie),
            &[("item_id", &item), ("quantity", "0")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("$128.00"));

    let items = app.carts.list_items(user).await.unwrap();
    assert_eq!(items[0].quantity.get(), 2);
}

#[tokio::test]
async fn test_update_without_item_id_is_rejected() {
    let app = TestApp::new();
    let (cookie, _) = app.register("ada@example.com").await;

    let response = app
        .post_form("/cart/update", Some(&cookie), &[("quantity", "2")])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_remove_rerenders_rolled_back_cart() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    let item = app.carts.list_items(user).await.unwrap()[0].id.to_string();

    app.carts.fail_removals(true);
    let response = app
        .post_form("/cart/remove", Some(&cookie), &[("item_id", &item)])
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.body.contains("WD 2TB Elements Portable Drive"));
    assert!(response.body.contains("temporarily unavailable"));
    assert_eq!(app.carts.list_items(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_line() {
    let app = TestApp::new();
    let (cookie, user) = app
        .shopper_with_cart(
            "ada@example.com",
            &[(products::DRIVE, 1), (products::T_SHIRT, 2)],
        )
        .await;
    let items = app.carts.list_items(user).await.unwrap();
    let drive = items
        .iter()
        .find(|i| i.product_id.as_i64() == products::DRIVE)
        .unwrap()
        .id
        .to_string();

    let response = app
        .post_form("/cart/remove", Some(&cookie), &[("item_id", &drive)])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let items = app.carts.list_items(user).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id.as_i64(), products::T_SHIRT);
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let app = TestApp::new();
    let (_, ada) = app
        .shopper_with_cart("ada@example.com", &[(products::DRIVE, 1)])
        .await;
    let (grace_cookie, grace) = app.register("grace@example.com").await;
    let ada_item = app.carts.list_items(ada).await.unwrap()[0].id.to_string();

    let response = app
        .post_form("/cart/remove", Some(&grace_cookie), &[("item_id", &ada_item)])
        .await;
    assert_ne!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.carts.list_items(ada).await.unwrap().len(), 1);
    assert!(app.carts.list_items(grace).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_shows_error_when_catalog_is_down() {
    let app = TestApp::new();
    app.catalog.set_unavailable(true);

    let response = app.get("/store", None).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.body.contains("Try again"));
}

#[tokio::test]
async fn test_category_filter() {
    let app = TestApp::new();

    let response = app.get("/store/category/electronics", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("WD 2TB Elements Portable Drive"));
    assert!(!response.body.contains("Fjallraven"));
}

#[tokio::test]
async fn test_product_page() {
    let app = TestApp::new();

    let response = app.get("/store/9", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("$64.00"));
    assert!(response.body.contains("/login?next=%2Fstore%2F9"));

    assert_eq!(app.get("/store/404", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/store/abc", None).await.status, StatusCode::NOT_FOUND);
}
