//! Checkout: turn a user's cart into a persisted order and an empty cart.
//!
//! Every step either completes or stops the checkout with a [`CheckoutError`].
//! Nothing is retried here, and the cart is only touched after the order has
//! been written.
//!
//! # Ordering
//!
//! With payments enabled the sequence is: snapshot cart, create payment
//! intent, (shopper confirms the card), verify the intent succeeded, write the
//! order, clear the cart. Payment capture and the order write are not atomic.
//! If the write fails after capture, the failure is reported to Sentry with
//! the payment intent id for manual reconciliation and the cart is left as it
//! was.

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use bramble_core::{
    CartItem, MinorUnits, OrderDraft, OrderId, OrderLine, OrderStatus, PaymentRecord,
    ShippingDetails, ShippingError, UserId, round_to_cents, subtotal,
};

use super::cart::CartStore;
use super::orders::OrderLedger;
use super::payments::{PaymentError, PaymentOrchestrator};
use crate::db::StoreError;

/// Reasons a checkout can stop.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("shipping details are incomplete: {0}")]
    IncompleteShipping(#[from] ShippingError),

    #[error("could not start payment: {0}")]
    PaymentSetupFailed(#[source] PaymentError),

    #[error("{0}")]
    PaymentDeclined(String),

    #[error("payment could not be confirmed: {0}")]
    PaymentProviderError(String),

    /// The order could not be written. If a payment was captured its id is
    /// carried here so support can reconcile it.
    #[error("could not save your order")]
    OrderPersistFailed {
        payment_intent_id: Option<String>,
        #[source]
        source: StoreError,
    },

    #[error("could not read your cart: {0}")]
    Storage(#[source] StoreError),
}

/// Shipping fields as submitted, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

/// Everything fixed at the start of a paid checkout, kept until the shopper
/// has confirmed the card.
#[derive(Clone, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub payment_intent_id: String,
    #[serde(with = "secret_string")]
    pub client_secret: SecretString,
    pub amount: MinorUnits,
    pub total: Decimal,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
}

impl std::fmt::Debug for PendingCheckout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCheckout")
            .field("payment_intent_id", &self.payment_intent_id)
            .field("client_secret", &"[REDACTED]")
            .field("amount", &self.amount)
            .field("total", &self.total)
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

/// Result of a completed checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub order_id: OrderId,
    /// `false` when the order was saved but emptying the cart failed.
    pub cart_cleared: bool,
}

/// A validated cart snapshot.
struct Snapshot {
    items: Vec<OrderLine>,
    total: Decimal,
    shipping: ShippingDetails,
}

impl Snapshot {
    fn new(items: &[CartItem], shipping: ShippingDetails) -> Self {
        Self {
            items: items.iter().map(CartItem::to_order_line).collect(),
            total: round_to_cents(subtotal(items)),
            shipping,
        }
    }
}

/// Coordinates the cart, the payment provider and the order ledger.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderLedger>,
    payments: Option<PaymentOrchestrator>,
}

impl CheckoutOrchestrator {
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderLedger>,
        payments: Option<PaymentOrchestrator>,
    ) -> Self {
        Self {
            carts,
            orders,
            payments,
        }
    }

    /// Whether checkout goes through the payment provider.
    #[must_use]
    pub const fn requires_payment(&self) -> bool {
        self.payments.is_some()
    }

    /// Check preconditions and snapshot the cart. No side effects.
    async fn snapshot(&self, user: UserId, shipping: &ShippingInput) -> Result<Snapshot, CheckoutError> {
        let items = self
            .carts
            .list_items(user)
            .await
            .map_err(CheckoutError::Storage)?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let shipping = ShippingDetails::new(&shipping.name, &shipping.address, &shipping.phone)?;
        Ok(Snapshot::new(&items, shipping))
    }

    /// Place an order without payment. The order is recorded as `placed`.
    ///
    /// # Errors
    ///
    /// `EmptyCart` or `IncompleteShipping` before any write; `OrderPersistFailed`
    /// if the ledger rejects the order.
    #[instrument(skip(self, shipping), fields(user_id = %user))]
    pub async fn place_order(
        &self,
        user: UserId,
        shipping: &ShippingInput,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let snapshot = self.snapshot(user, shipping).await?;

        let draft = OrderDraft {
            total: snapshot.total,
            items: snapshot.items,
            shipping: snapshot.shipping,
            payment: None,
            status: Some(OrderStatus::Placed),
        };

        let order_id = self
            .orders
            .create_order(user, draft)
            .await
            .map_err(|source| {
                tracing::error!(error = %source, "failed to persist order");
                CheckoutError::OrderPersistFailed {
                    payment_intent_id: None,
                    source,
                }
            })?;

        Ok(self.finish(user, order_id).await)
    }

    /// Snapshot the cart and create a payment intent for its total.
    ///
    /// # Errors
    ///
    /// `EmptyCart` or `IncompleteShipping` before any provider call;
    /// `PaymentSetupFailed` if the intent cannot be created.
    #[instrument(skip(self, shipping), fields(user_id = %user))]
    pub async fn begin_payment(
        &self,
        user: UserId,
        shipping: &ShippingInput,
    ) -> Result<PendingCheckout, CheckoutError> {
        let snapshot = self.snapshot(user, shipping).await?;
        let payments = self
            .payments
            .as_ref()
            .ok_or(CheckoutError::PaymentSetupFailed(PaymentError::NotConfigured))?;

        let amount = MinorUnits::from_decimal(snapshot.total)
            .ok_or(CheckoutError::PaymentSetupFailed(PaymentError::InvalidAmount))?;

        let intent = payments
            .create_payment_intent(amount.get(), Some(user))
            .await
            .map_err(CheckoutError::PaymentSetupFailed)?;

        Ok(PendingCheckout {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount,
            total: snapshot.total,
            items: snapshot.items,
            shipping: snapshot.shipping,
        })
    }

    /// Verify the shopper's payment, then record the order and empty the cart.
    ///
    /// The order is built from the snapshot taken in [`Self::begin_payment`],
    /// never from the live cart.
    ///
    /// # Errors
    ///
    /// `PaymentDeclined` / `PaymentProviderError` if the payment is not
    /// confirmed for exactly the snapshot amount; `OrderPersistFailed` if the
    /// order cannot be written after payment.
    #[instrument(skip(self, pending), fields(user_id = %user, payment_intent_id = %pending.payment_intent_id))]
    pub async fn complete_payment(
        &self,
        user: UserId,
        pending: PendingCheckout,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let payments = self
            .payments
            .as_ref()
            .ok_or(CheckoutError::PaymentSetupFailed(PaymentError::NotConfigured))?;

        let confirmed = payments
            .confirm_payment(&pending.client_secret)
            .await
            .map_err(|e| match e {
                PaymentError::Declined(message) => CheckoutError::PaymentDeclined(message),
                other => CheckoutError::PaymentProviderError(other.to_string()),
            })?;

        if confirmed.amount != pending.amount || confirmed.payment_intent_id != pending.payment_intent_id {
            tracing::error!(
                expected = %pending.amount,
                confirmed = %confirmed.amount,
                "confirmed payment does not match checkout"
            );
            return Err(CheckoutError::PaymentProviderError(
                "confirmed payment does not match your order".to_string(),
            ));
        }

        let draft = OrderDraft {
            total: pending.total,
            items: pending.items,
            shipping: pending.shipping,
            payment: Some(PaymentRecord {
                provider: confirmed.provider.to_string(),
                payment_intent_id: confirmed.payment_intent_id.clone(),
            }),
            status: Some(OrderStatus::Paid),
        };

        let order_id = match self.orders.create_order(user, draft).await {
            Ok(id) => id,
            Err(source) => {
                report_unrecorded_payment(user, &confirmed.payment_intent_id, &source);
                return Err(CheckoutError::OrderPersistFailed {
                    payment_intent_id: Some(confirmed.payment_intent_id),
                    source,
                });
            }
        };

        Ok(self.finish(user, order_id).await)
    }

    /// Empty the cart after an order was written. A failure here is logged but
    /// never undoes the order.
    async fn finish(&self, user: UserId, order_id: OrderId) -> CheckoutOutcome {
        tracing::info!(%order_id, "order placed");

        let cart_cleared = match self.carts.clear(user).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(%order_id, error = %err, "order placed but cart could not be cleared");
                sentry::with_scope(
                    |scope| {
                        scope.set_tag("user_id", user);
                        scope.set_tag("order_id", order_id);
                    },
                    || sentry::capture_error(&err),
                );
                false
            }
        };

        CheckoutOutcome {
            order_id,
            cart_cleared,
        }
    }
}

/// Payment captured but no order recorded.
fn report_unrecorded_payment(user: UserId, payment_intent_id: &str, err: &StoreError) {
    tracing::error!(
        %user,
        payment_intent_id,
        error = %err,
        "payment captured but order could not be saved; reconcile manually"
    );
    sentry::with_scope(
        |scope| {
            scope.set_level(Some(sentry::Level::Fatal));
            scope.set_tag("user_id", user);
            scope.set_tag("payment_intent_id", payment_intent_id);
        },
        || sentry::capture_error(err),
    );
}

/// Serde adapter so the client secret can live in the server-side session.
mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use mockall::predicate::always;

    use super::*;
    use crate::services::cart::MockCartStore;
    use crate::services::orders::MockOrderLedger;
    use crate::services::payments::{
        IntentState, IntentStatus, MockPaymentGateway, PaymentIntent,
    };
    use bramble_core::{CartItemId, ProductId, Quantity};

    fn line(product: i64, price: &str, quantity: i64) -> CartItem {
        let now = Utc::now();
        CartItem {
            id: CartItemId::generate(),
            product_id: ProductId::new(product).unwrap(),
            title: format!("Product {product}"),
            price: Decimal::from_str(price).unwrap(),
            image: format!("https://img.example/{product}.png"),
            category: "jewelery".to_string(),
            quantity: Quantity::new(quantity).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn shipping() -> ShippingInput {
        ShippingInput {
            name: "Ada Lovelace".to_string(),
            address: "12 St James's Square".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    fn carts_with(items: Vec<CartItem>) -> MockCartStore {
        let mut carts = MockCartStore::new();
        carts.expect_list_items().returning(move |_| Ok(items.clone()));
        carts
    }

    fn gateway(status: IntentStatus, amount: i64) -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_provider().return_const("stripe");
        gateway.expect_create_intent().returning(|amount, _| {
            Ok(PaymentIntent {
                id: "pi_42".to_string(),
                client_secret: SecretString::from("pi_42_secret_s"),
                amount,
            })
        });
        gateway.expect_retrieve_intent().returning(move |id| {
            Ok(IntentState {
                id: id.to_string(),
                status: status.clone(),
                amount: MinorUnits::new(amount),
                failure_message: None,
            })
        });
        gateway
    }

    fn payments(gateway: MockPaymentGateway) -> Option<PaymentOrchestrator> {
        Some(PaymentOrchestrator::new(Arc::new(gateway), "pk_test"))
    }

    #[tokio::test]
    async fn test_empty_cart_fails_before_payment_or_persistence() {
        let carts = carts_with(vec![]);
        let mut orders = MockOrderLedger::new();
        orders.expect_create_order().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_provider().return_const("stripe");
        gateway.expect_create_intent().never();
        gateway.expect_retrieve_intent().never();

        let checkout =
            CheckoutOrchestrator::new(Arc::new(carts), Arc::new(orders), payments(gateway));

        let result = checkout.begin_payment(UserId::generate(), &shipping()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));

        let result = checkout.place_order(UserId::generate(), &shipping()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_blank_shipping_field_fails_before_side_effects() {
        let carts = carts_with(vec![line(1, "10.00", 1)]);
        let mut orders = MockOrderLedger::new();
        orders.expect_create_order().never();

        let checkout = CheckoutOrchestrator::new(Arc::new(carts), Arc::new(orders), None);
        let input = ShippingInput {
            phone: "   ".to_string(),
            ..shipping()
        };

        let result = checkout.place_order(UserId::generate(), &input).await;
        assert!(matches!(
            result,
            Err(CheckoutError::IncompleteShipping(ShippingError::MissingPhone))
        ));
    }

    #[tokio::test]
    async fn test_place_order_without_payment() {
        let user = UserId::generate();
        let items = vec![line(1, "9.995", 2), line(2, "5.50", 1)];
        let expected_lines: Vec<OrderLine> = items.iter().map(CartItem::to_order_line).collect();

        let mut carts = carts_with(items);
        carts.expect_clear().times(1).returning(|_| Ok(()));

        let mut orders = MockOrderLedger::new();
        orders
            .expect_create_order()
            .withf(move |_, draft| {
                draft.status == Some(OrderStatus::Placed)
                    && draft.payment.is_none()
                    && draft.items == expected_lines
                    && draft.total == Decimal::from_str("25.49").unwrap()
            })
            .times(1)
            .returning(|_, _| Ok(OrderId::generate()));

        let checkout = CheckoutOrchestrator::new(Arc::new(carts), Arc::new(orders), None);
        let outcome = checkout.place_order(user, &shipping()).await.unwrap();
        assert!(outcome.cart_cleared);
    }

    #[tokio::test]
    async fn test_paid_checkout_records_payment_and_clears_cart() {
        let user = UserId::generate();
        let mut carts = carts_with(vec![line(3, "9.995", 2)]);
        carts.expect_clear().times(1).returning(|_| Ok(()));

        let mut orders = MockOrderLedger::new();
        orders
            .expect_create_order()
            .withf(|_, draft| {
                draft.status == Some(OrderStatus::Paid)
                    && draft.total == Decimal::from_str("19.99").unwrap()
                    && draft.payment
                        == Some(PaymentRecord {
                            provider: "stripe".to_string(),
                            payment_intent_id: "pi_42".to_string(),
                        })
            })
            .times(1)
            .returning(|_, _| Ok(OrderId::generate()));

        let checkout = CheckoutOrchestrator::new(
            Arc::new(carts),
            Arc::new(orders),
            payments(gateway(IntentStatus::Succeeded, 1999)),
        );

        let pending = checkout.begin_payment(user, &shipping()).await.unwrap();
        assert_eq!(pending.amount, MinorUnits::new(1999));

        let outcome = checkout.complete_payment(user, pending).await.unwrap();
        assert!(outcome.cart_cleared);
    }

    #[tokio::test]
    async fn test_declined_payment_writes_nothing() {
        let user = UserId::generate();
        let mut carts = carts_with(vec![line(3, "20.00", 1)]);
        carts.expect_clear().never();
        let mut orders = MockOrderLedger::new();
        orders.expect_create_order().never();

        let checkout = CheckoutOrchestrator::new(
            Arc::new(carts),
            Arc::new(orders),
            payments(gateway(IntentStatus::RequiresPaymentMethod, 2000)),
        );

        let pending = checkout.begin_payment(user, &shipping()).await.unwrap();
        let result = checkout.complete_payment(user, pending).await;
        assert!(matches!(result, Err(CheckoutError::PaymentDeclined(_))));
    }

    #[tokio::test]
    async fn test_amount_mismatch_is_not_recorded() {
        let user = UserId::generate();
        let mut carts = carts_with(vec![line(3, "20.00", 1)]);
        carts.expect_clear().never();
        let mut orders = MockOrderLedger::new();
        orders.expect_create_order().never();

        let checkout = CheckoutOrchestrator::new(
            Arc::new(carts),
            Arc::new(orders),
            payments(gateway(IntentStatus::Succeeded, 500)),
        );

        let pending = checkout.begin_payment(user, &shipping()).await.unwrap();
        let result = checkout.complete_payment(user, pending).await;
        assert!(matches!(result, Err(CheckoutError::PaymentProviderError(_))));
    }

    #[tokio::test]
    async fn test_persist_failure_after_payment_keeps_cart() {
        let user = UserId::generate();
        let mut carts = carts_with(vec![line(3, "20.00", 1)]);
        carts.expect_clear().never();
        let mut orders = MockOrderLedger::new();
        orders
            .expect_create_order()
            .with(always(), always())
            .returning(|_, _| Err(StoreError::Unavailable("primary down".to_string())));

        let checkout = CheckoutOrchestrator::new(
            Arc::new(carts),
            Arc::new(orders),
            payments(gateway(IntentStatus::Succeeded, 2000)),
        );

        let pending = checkout.begin_payment(user, &shipping()).await.unwrap();
        let result = checkout.complete_payment(user, pending).await;
        assert!(matches!(
            result,
            Err(CheckoutError::OrderPersistFailed { payment_intent_id: Some(ref id), .. }) if id == "pi_42"
        ));
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_order() {
        let user = UserId::generate();
        let mut carts = carts_with(vec![line(3, "20.00", 1)]);
        carts
            .expect_clear()
            .returning(|_| Err(StoreError::Unavailable("timeout".to_string())));
        let order_id = OrderId::generate();
        let mut orders = MockOrderLedger::new();
        orders.expect_create_order().returning(move |_, _| Ok(order_id));

        let checkout = CheckoutOrchestrator::new(Arc::new(carts), Arc::new(orders), None);
        let outcome = checkout.place_order(user, &shipping()).await.unwrap();

        assert_eq!(outcome.order_id, order_id);
        assert!(!outcome.cart_cleared);
    }

    #[tokio::test]
    async fn test_begin_payment_below_minimum_is_setup_failure() {
        let carts = carts_with(vec![line(1, "0.25", 1)]);
        let orders = MockOrderLedger::new();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_provider().return_const("stripe");
        gateway.expect_create_intent().never();

        let checkout =
            CheckoutOrchestrator::new(Arc::new(carts), Arc::new(orders), payments(gateway));
        let result = checkout.begin_payment(UserId::generate(), &shipping()).await;
        assert!(matches!(
            result,
            Err(CheckoutError::PaymentSetupFailed(PaymentError::InvalidAmount))
        ));
    }
}
