//! Bramble Storefront - Public e-commerce site.
//!
//! This binary serves the storefront on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - Remote product catalog over HTTP, cached in memory
//! - `PostgreSQL` for accounts, carts, orders and sessions
//! - Stripe for card payments when configured; otherwise orders are placed
//!   without payment
//!
//! Migrations are not run on startup. Run them with `bramble migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use sentry::integrations::tracing as sentry_tracing;
use sqlx::PgPool;
use tower_http::services::ServeDir;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bramble_storefront::catalog::CatalogClient;
use bramble_storefront::config::StorefrontConfig;
use bramble_storefront::db::{self, PgCartStore, PgCredentialStore, PgOrderLedger};
use bramble_storefront::middleware::create_session_layer;
use bramble_storefront::routes;
use bramble_storefront::services::auth::AuthService;
use bramble_storefront::services::payments::{PaymentOrchestrator, StripeGateway};
use bramble_storefront::session::SessionState;
use bramble_storefront::state::{AppServices, AppState};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Log every sign-in and sign-out for as long as the process runs.
fn spawn_session_logger(session_state: &SessionState) {
    let mut subscription = session_state.subscribe();
    tokio::spawn(async move {
        while let Some(snapshot) = subscription.changed().await {
            match snapshot.user {
                Some(user) => tracing::info!(user_id = %user.id, "session signed in"),
                None if !snapshot.loading => tracing::info!("session signed out"),
                None => {}
            }
        }
    });
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bramble_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Failed to prepare session table");
    let session_layer = create_session_layer(session_store, config.is_secure());

    let payments = config.stripe.as_ref().map(|stripe| {
        PaymentOrchestrator::new(
            Arc::new(StripeGateway::new(stripe)),
            stripe.publishable_key.clone(),
        )
    });
    if payments.is_none() {
        tracing::warn!("Stripe is not configured; orders will be placed without payment");
    }

    let services = AppServices {
        catalog: Arc::new(CatalogClient::new(&config.catalog)),
        carts: Arc::new(PgCartStore::new(pool.clone())),
        orders: Arc::new(PgOrderLedger::new(pool.clone())),
        auth: Arc::new(AuthService::new(PgCredentialStore::new(pool.clone()))),
        payments,
    };

    let session_state = SessionState::new();
    spawn_session_logger(&session_state);
    let state = AppState::new(services, session_state.clone());
    // Nothing to restore: each request carries its own session cookie.
    session_state.resolve(None);

    let health = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .with_state(pool);

    let app = routes::app(state, session_layer)
        .merge(health)
        .nest_service("/static", ServeDir::new("crates/storefront/static"))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(pool): State<PgPool>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(&pool).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
