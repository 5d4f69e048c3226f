//! In-memory implementations of the storage, catalog and payment seams.
//!
//! Used by the integration tests and for running the storefront without
//! Postgres or a payment provider. Each store can be switched into a failing
//! mode to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::Mutex;

use bramble_core::{
    CartItem, CartItemId, Email, MinorUnits, Order, OrderDraft, OrderId, Product, ProductId,
    Quantity, UserId,
};

use super::auth::CredentialStore;
use super::cart::{CartStore, require_quantity};
use super::orders::OrderLedger;
use super::payments::{
    IntentMetadata, IntentState, IntentStatus, PaymentError, PaymentGateway, PaymentIntent,
};
use crate::catalog::{Catalog, CatalogError};
use crate::db::StoreError;
use crate::models::User;

fn unavailable() -> StoreError {
    StoreError::Unavailable("in-memory store switched off".to_string())
}

// =============================================================================
// Cart
// =============================================================================

/// Cart store held in a map keyed by user.
#[derive(Default)]
pub struct MemoryCartStore {
    carts: Mutex<HashMap<UserId, Vec<CartItem>>>,
    unavailable: AtomicBool,
    fail_removals: AtomicBool,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `remove_item` (and therefore `clear`) fail.
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn list_items(&self, user: UserId) -> Result<Vec<CartItem>, StoreError> {
        self.check()?;
        Ok(self.carts.lock().await.get(&user).cloned().unwrap_or_default())
    }

    async fn add_item(
        &self,
        user: UserId,
        product: &Product,
        quantity: i64,
    ) -> Result<CartItemId, StoreError> {
        self.check()?;
        let quantity = Quantity::clamped(quantity);
        let now = Utc::now();

        let mut carts = self.carts.lock().await;
        let lines = carts.entry(user).or_default();

        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.updated_at = now;
            return Ok(line.id);
        }

        let id = CartItemId::generate();
        lines.push(CartItem {
            id,
            product_id: product.id,
            title: product.title.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
            quantity,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        self.check()?;
        let quantity = require_quantity(quantity)?;

        let mut carts = self.carts.lock().await;
        if let Some(line) = carts
            .get_mut(&user)
            .and_then(|lines| lines.iter_mut().find(|l| l.id == item))
        {
            line.quantity = quantity;
            line.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_item(&self, user: UserId, item: CartItemId) -> Result<(), StoreError> {
        self.check()?;
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        if let Some(lines) = self.carts.lock().await.get_mut(&user) {
            lines.retain(|l| l.id != item);
        }
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order ledger held in a map keyed by user.
#[derive(Default)]
pub struct MemoryOrderLedger {
    orders: Mutex<HashMap<UserId, Vec<Order>>>,
    fail_writes: AtomicBool,
}

impl MemoryOrderLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_order` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderLedger for MemoryOrderLedger {
    async fn create_order(&self, user: UserId, draft: OrderDraft) -> Result<OrderId, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let order = Order::from(draft.into_new_order(OrderId::generate(), Utc::now()));
        let id = order.id;
        self.orders.lock().await.entry(user).or_default().push(order);
        Ok(id)
    }

    async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let mut orders = self
            .orders
            .lock()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default();
        // Insertion order breaks ties between equal timestamps.
        orders.reverse();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Credential store held in a map keyed by email.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<Email, (User, String)>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, email: &Email, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.contains_key(email) {
            return Err(StoreError::Conflict(format!("email {email} is taken")));
        }

        let user = User {
            id: UserId::generate(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        users.insert(email.clone(), (user.clone(), password_hash.to_string()));
        Ok(user)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<(User, String)>, StoreError> {
        Ok(self.users.lock().await.get(email).cloned())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A fixed product list.
pub struct StaticCatalog {
    products: Vec<Product>,
    unavailable: AtomicBool,
}

impl StaticCatalog {
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every request fail as if the catalog answered 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::RequestFailed {
                status: 503,
                body: "catalog unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        self.check()?;
        Ok(self.products.clone())
    }

    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.check()?;
        self.products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        self.check()?;
        let mut categories: Vec<String> = Vec::new();
        for product in &self.products {
            if !categories.contains(&product.category) {
                categories.push(product.category.clone());
            }
        }
        Ok(categories)
    }

    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        if category.is_empty() {
            return Ok(Vec::new());
        }
        self.check()?;
        Ok(self
            .products
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Payment gateway that answers from a script instead of a provider.
///
/// Every intent it creates reports the configured outcome when retrieved
/// (`succeeded` by default).
pub struct ScriptedGateway {
    intents: Mutex<HashMap<String, MinorUnits>>,
    outcome: Mutex<IntentStatus>,
    fail_creates: AtomicBool,
    created: AtomicUsize,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            intents: Mutex::new(HashMap::new()),
            outcome: Mutex::new(IntentStatus::Succeeded),
            fail_creates: AtomicBool::new(false),
            created: AtomicUsize::new(0),
        }
    }
}

impl ScriptedGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status every intent reports from now on.
    pub async fn set_outcome(&self, status: IntentStatus) {
        *self.outcome.lock().await = status;
    }

    /// Make `create_intent` fail with a provider error.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Number of intents created so far.
    #[must_use]
    pub fn intents_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    async fn create_intent(
        &self,
        amount: MinorUnits,
        _metadata: IntentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(PaymentError::Provider("scripted provider failure".to_string()));
        }

        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_scripted{n}");
        self.intents.lock().await.insert(id.clone(), amount);

        Ok(PaymentIntent {
            client_secret: SecretString::from(format!("{id}_secret_scripted")),
            id,
            amount,
        })
    }

    async fn retrieve_intent(&self, id: &str) -> Result<IntentState, PaymentError> {
        let amount = self
            .intents
            .lock()
            .await
            .get(id)
            .copied()
            .ok_or_else(|| PaymentError::Provider(format!("no such payment intent: {id}")))?;
        let status = self.outcome.lock().await.clone();

        let failure_message = matches!(
            status,
            IntentStatus::RequiresPaymentMethod | IntentStatus::Canceled
        )
        .then(|| "Your card was declined.".to_string());

        Ok(IntentState {
            id: id.to_string(),
            status,
            amount,
            failure_message,
        })
    }
}
