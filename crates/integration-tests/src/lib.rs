//! Integration tests for Bramble.
//!
//! The tests drive the storefront router in-process. Carts, orders, accounts,
//! the catalog and the payment provider are the in-memory implementations
//! from `bramble_storefront::services::memory`, so no database or network is
//! needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bramble-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use bramble_core::{Product, ProductId, UserId};
use bramble_storefront::middleware::create_session_layer;
use bramble_storefront::routes;
use bramble_storefront::services::auth::AuthService;
use bramble_storefront::services::memory::{
    MemoryCartStore, MemoryCredentialStore, MemoryOrderLedger, ScriptedGateway, StaticCatalog,
};
use bramble_storefront::services::payments::PaymentOrchestrator;
use bramble_storefront::session::SessionState;
use bramble_storefront::state::{AppServices, AppState};

/// Password used for every test account.
pub const PASSWORD: &str = "correct horse battery";

/// Product ids in [`catalog`].
pub mod products {
    pub const BACKPACK: i64 = 1;
    pub const T_SHIRT: i64 = 2;
    pub const RING: i64 = 5;
    pub const DRIVE: i64 = 9;
}

/// The fixed catalog every test app serves.
#[must_use]
pub fn catalog() -> Vec<Product> {
    let product = |id: i64, title: &str, price: Decimal, category: &str| {
        Product::new(
            ProductId::new(id).unwrap(),
            title,
            price,
            format!("https://img.example/{id}.jpg"),
            category,
            format!("{title} description"),
        )
        .unwrap()
    };

    vec![
        product(
            products::BACKPACK,
            "Fjallraven Foldsack No. 1 Backpack",
            Decimal::new(10995, 2),
            "men's clothing",
        ),
        product(
            products::T_SHIRT,
            "Mens Casual Premium Slim Fit T-Shirts",
            Decimal::new(223, 1),
            "men's clothing",
        ),
        product(products::RING, "Petite Micropave Ring", Decimal::new(10, 2), "jewelery"),
        product(products::DRIVE, "WD 2TB Elements Portable Drive", Decimal::new(64, 0), "electronics"),
    ]
}

/// A storefront wired to in-memory services, with handles on each of them.
pub struct TestApp {
    router: Router,
    pub catalog: Arc<StaticCatalog>,
    pub carts: Arc<MemoryCartStore>,
    pub orders: Arc<MemoryOrderLedger>,
    pub gateway: Option<Arc<ScriptedGateway>>,
    pub session_state: SessionState,
}

impl TestApp {
    /// Payment-free storefront with auth ready.
    #[must_use]
    pub fn new() -> Self {
        Self::build(false, true)
    }

    /// Storefront taking card payments through a [`ScriptedGateway`].
    #[must_use]
    pub fn with_payments() -> Self {
        Self::build(true, true)
    }

    /// Storefront whose auth state has not resolved yet.
    #[must_use]
    pub fn loading() -> Self {
        Self::build(false, false)
    }

    fn build(payments: bool, resolved: bool) -> Self {
        let catalog = Arc::new(StaticCatalog::new(catalog()));
        let carts = Arc::new(MemoryCartStore::new());
        let orders = Arc::new(MemoryOrderLedger::new());
        let gateway = payments.then(|| Arc::new(ScriptedGateway::new()));

        let services = AppServices {
            catalog: catalog.clone(),
            carts: carts.clone(),
            orders: orders.clone(),
            auth: Arc::new(AuthService::new(MemoryCredentialStore::new())),
            payments: gateway
                .clone()
                .map(|g| PaymentOrchestrator::new(g, "pk_test_bramble")),
        };

        let session_state = SessionState::new();
        if resolved {
            session_state.resolve(None);
        }

        let state = AppState::new(services, session_state.clone());
        let router = routes::app(state, create_session_layer(MemoryStore::default(), false));

        Self {
            router,
            catalog,
            carts,
            orders,
            gateway,
            session_state,
        }
    }

    /// The scripted payment provider. Panics for a payment-free app.
    #[must_use]
    pub fn gateway(&self) -> &ScriptedGateway {
        self.gateway.as_deref().unwrap()
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.send(
            request(Method::POST, uri, cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        cookie: Option<&str>,
        body: &serde_json::Value,
    ) -> TestResponse {
        self.send(
            request(Method::POST, uri, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST a body as-is, with whatever content type (if any) is given.
    pub async fn post_raw(
        &self,
        uri: &str,
        cookie: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = request(Method::POST, uri, cookie);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Create an account and return its session cookie and id.
    pub async fn register(&self, email: &str) -> (String, UserId) {
        let response = self
            .post_form(
                "/register",
                None,
                &[
                    ("email", email),
                    ("password", PASSWORD),
                    ("password_confirm", PASSWORD),
                    ("next", "/store"),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);

        let cookie = response.session_cookie().unwrap();
        let user = self.session_state.snapshot().user.unwrap();
        (cookie, user.id)
    }

    /// Register a shopper and put `(product, quantity)` lines in their cart.
    pub async fn shopper_with_cart(&self, email: &str, lines: &[(i64, u32)]) -> (String, UserId) {
        let (cookie, user) = self.register(email).await;
        for (product, quantity) in lines {
            let response = self
                .post_form(
                    "/cart/add",
                    Some(&cookie),
                    &[
                        ("product_id", &product.to_string()),
                        ("quantity", &quantity.to_string()),
                    ],
                )
                .await;
            assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
        }
        (cookie, user)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn request(method: Method, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match cookie {
        Some(cookie) => builder.header(header::COOKIE, cookie),
        None => builder,
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// `name=value` of the session cookie, if one was set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("bramble_session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Standard shipping form fields.
#[must_use]
pub fn shipping_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Ada Lovelace"),
        ("address", "12 Analytical Row, London"),
        ("phone", "555-0100"),
    ]
}
