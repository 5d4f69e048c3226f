//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::services::auth::AuthProvider;
use crate::services::cart::CartStore;
use crate::services::checkout::CheckoutOrchestrator;
use crate::services::orders::OrderLedger;
use crate::services::payments::PaymentOrchestrator;
use crate::session::SessionState;

/// The collaborators the storefront is built from.
///
/// `main` wires the Postgres stores and the HTTP clients; tests wire the
/// in-memory ones.
pub struct AppServices {
    pub catalog: Arc<dyn Catalog>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderLedger>,
    pub auth: Arc<dyn AuthProvider>,
    /// `None` selects the payment-free checkout.
    pub payments: Option<PaymentOrchestrator>,
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderLedger>,
    auth: Arc<dyn AuthProvider>,
    payments: Option<PaymentOrchestrator>,
    checkout: CheckoutOrchestrator,
    session: SessionState,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(services: AppServices, session: SessionState) -> Self {
        let checkout = CheckoutOrchestrator::new(
            Arc::clone(&services.carts),
            Arc::clone(&services.orders),
            services.payments.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                catalog: services.catalog,
                carts: services.carts,
                orders: services.orders,
                auth: services.auth,
                payments: services.payments,
                checkout,
                session,
            }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &dyn CartStore {
        self.inner.carts.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderLedger {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.inner.auth.as_ref()
    }

    /// Payment orchestrator, if card payments are configured.
    #[must_use]
    pub fn payments(&self) -> Option<&PaymentOrchestrator> {
        self.inner.payments.as_ref()
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.inner.checkout
    }

    /// Process-wide authentication state.
    #[must_use]
    pub fn session_state(&self) -> &SessionState {
        &self.inner.session
    }
}
