//! Stripe REST client for payment intents.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use bramble_core::{CURRENCY, MinorUnits};

use super::{IntentMetadata, IntentState, IntentStatus, PaymentError, PaymentGateway, PaymentIntent};
use crate::config::{StripeConfig, with_trailing_slash};

/// Payment gateway backed by the Stripe API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: Url,
    secret_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    amount: i64,
    status: IntentStatus,
    client_secret: Option<String>,
    last_payment_error: Option<StripeErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

impl StripeGateway {
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: with_trailing_slash(config.api_base.clone()),
            secret_key: config.secret_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        self.api_base
            .join(path)
            .map_err(|e| PaymentError::Provider(format!("invalid Stripe endpoint: {e}")))
    }

    async fn read_intent(response: reqwest::Response) -> Result<IntentResponse, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Stripe API returned non-success status"
            );
            return Err(error_from_body(&body, status));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Stripe payment intent");
            PaymentError::Provider(format!("unexpected Stripe response: {e}"))
        })
    }
}

/// Map a Stripe error body to a payment error. Card errors are declines.
fn error_from_body(body: &str, status: reqwest::StatusCode) -> PaymentError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| format!("Stripe returned HTTP {status}"));

    match parsed.and_then(|e| e.error.kind).as_deref() {
        Some("card_error") => PaymentError::Declined(message),
        _ => PaymentError::Provider(message),
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> &'static str {
        "stripe"
    }

    #[instrument(skip(self))]
    async fn create_intent(
        &self,
        amount: MinorUnits,
        metadata: IntentMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut form = vec![
            ("amount", amount.get().to_string()),
            ("currency", CURRENCY.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        if let Some(user_id) = metadata.user_id {
            form.push(("metadata[user_id]", user_id.to_string()));
        }

        let response = self
            .client
            .post(self.endpoint("v1/payment_intents")?)
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let intent = Self::read_intent(response).await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Provider("payment intent has no client secret".into()))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: SecretString::from(client_secret),
            amount: MinorUnits::new(intent.amount),
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, id: &str) -> Result<IntentState, PaymentError> {
        let path = format!("v1/payment_intents/{}", urlencoding::encode(id));
        let response = self
            .client
            .get(self.endpoint(&path)?)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;

        let intent = Self::read_intent(response).await?;
        Ok(IntentState {
            id: intent.id,
            status: intent.status,
            amount: MinorUnits::new(intent.amount),
            failure_message: intent.last_payment_error.and_then(|e| e.message),
        })
    }
}
