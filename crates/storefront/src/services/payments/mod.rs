//! Card payments.
//!
//! A payment runs in two halves. The server creates a payment intent for the
//! order amount and hands its client secret to the browser, which confirms the
//! card with the provider. The server then looks the intent up again and only
//! treats it as paid once the provider reports it succeeded.

mod stripe;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use bramble_core::{MINIMUM_CHARGE, MinorUnits, UserId};

pub use stripe::StripeGateway;

/// Separator between the intent id and the secret part of a client secret.
const CLIENT_SECRET_SEPARATOR: &str = "_secret_";

/// Errors from the payment provider or from payment input validation.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Amount is below the provider minimum or not a whole number of minor units.
    #[error("Invalid amount")]
    InvalidAmount,

    /// The provider refused the card.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The provider failed or answered with something unusable.
    #[error("payment provider error: {0}")]
    Provider(String),

    /// Transport failure talking to the provider.
    #[error("payment provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// A client secret that does not name a payment intent.
    #[error("malformed client secret")]
    MalformedClientSecret,

    /// Payments are not enabled on this storefront.
    #[error("payments are not configured")]
    NotConfigured,
}

/// A freshly created payment intent.
#[derive(Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: SecretString,
    pub amount: MinorUnits,
}

impl std::fmt::Debug for PaymentIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntent")
            .field("id", &self.id)
            .field("client_secret", &"[REDACTED]")
            .field("amount", &self.amount)
            .finish()
    }
}

/// Provider-side status of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// What the provider currently knows about an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentState {
    pub id: String,
    pub status: IntentStatus,
    pub amount: MinorUnits,
    /// Provider's explanation of the last failed attempt, if any.
    pub failure_message: Option<String>,
}

/// Metadata attached to an intent so a payment can be traced back to a shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentMetadata {
    pub user_id: Option<UserId>,
}

/// A payment the provider has confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPayment {
    pub provider: &'static str,
    pub payment_intent_id: String,
    pub amount: MinorUnits,
}

/// A card payment provider.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Short provider name recorded on orders.
    fn provider(&self) -> &'static str;

    /// Create an intent for `amount` in the shop currency.
    async fn create_intent(
        &self,
        amount: MinorUnits,
        metadata: IntentMetadata,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Look up an intent by id.
    async fn retrieve_intent(&self, id: &str) -> Result<IntentState, PaymentError>;
}

/// Validates payment input and drives the provider.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    publishable_key: String,
}

impl PaymentOrchestrator {
    #[must_use]
    pub fn new(gateway: Arc<dyn PaymentGateway>, publishable_key: impl Into<String>) -> Self {
        Self {
            gateway,
            publishable_key: publishable_key.into(),
        }
    }

    /// Key the browser uses to load the provider's card form.
    #[must_use]
    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }

    /// Create a payment intent for `amount` minor units.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` below the minimum charge, or the
    /// provider's error.
    #[instrument(skip(self), fields(provider = self.gateway.provider()))]
    pub async fn create_payment_intent(
        &self,
        amount: i64,
        user: Option<UserId>,
    ) -> Result<PaymentIntent, PaymentError> {
        let amount = MinorUnits::new(amount);
        if !amount.is_chargeable() {
            tracing::debug!(%amount, minimum = %MINIMUM_CHARGE, "rejecting amount below minimum");
            return Err(PaymentError::InvalidAmount);
        }

        let intent = self
            .gateway
            .create_intent(amount, IntentMetadata { user_id: user })
            .await?;

        tracing::info!(payment_intent_id = %intent.id, %amount, "payment intent created");
        Ok(intent)
    }

    /// Check that the intent behind `client_secret` has been paid.
    ///
    /// # Errors
    ///
    /// - `Declined` when the card was refused or the intent was canceled
    /// - `Provider` when the intent is in any other unfinished state
    /// - `MalformedClientSecret` when the secret does not name an intent
    #[instrument(skip_all, fields(provider = self.gateway.provider()))]
    pub async fn confirm_payment(
        &self,
        client_secret: &SecretString,
    ) -> Result<ConfirmedPayment, PaymentError> {
        let intent_id = intent_id_from_client_secret(client_secret.expose_secret())?;
        let state = self.gateway.retrieve_intent(intent_id).await?;

        match state.status {
            IntentStatus::Succeeded => {
                tracing::info!(payment_intent_id = %state.id, "payment confirmed");
                Ok(ConfirmedPayment {
                    provider: self.gateway.provider(),
                    payment_intent_id: state.id,
                    amount: state.amount,
                })
            }
            IntentStatus::RequiresPaymentMethod | IntentStatus::Canceled => {
                Err(PaymentError::Declined(state.failure_message.unwrap_or_else(
                    || "Your payment was not completed. Please try another card.".to_string(),
                )))
            }
            other => Err(PaymentError::Provider(format!(
                "payment is not complete (status: {other:?})"
            ))),
        }
    }
}

/// Extract the intent id (`pi_...`) from a client secret (`pi_..._secret_...`).
fn intent_id_from_client_secret(client_secret: &str) -> Result<&str, PaymentError> {
    client_secret
        .split_once(CLIENT_SECRET_SEPARATOR)
        .map(|(id, _)| id)
        .filter(|id| id.starts_with("pi_") && id.len() > 3)
        .ok_or(PaymentError::MalformedClientSecret)
}
