//! Payment intent endpoint used by the card form.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::middleware::RequireUser;
use crate::routes::api::ApiError;
use crate::services::payments::PaymentError;
use crate::state::AppState;

/// Successful response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Read `amount` as whole minor units.
///
/// Numbers and numeric strings are accepted as long as they hold an integer.
#[allow(clippy::cast_possible_truncation)]
fn parse_amount(body: &Value) -> Option<i64> {
    match body.get("amount")? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// `POST /api/stripe/create-payment-intent` with `{"amount": <minor units>}`.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable payment intent body");
        ApiError::bad_request("Invalid amount")
    })?;
    let amount = parse_amount(&body).ok_or_else(|| ApiError::bad_request("Invalid amount"))?;

    let payments = state.payments().ok_or_else(|| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Payments are not available")
    })?;

    let intent = payments
        .create_payment_intent(amount, Some(user.id))
        .await
        .map_err(|e| match e {
            PaymentError::InvalidAmount => ApiError::bad_request("Invalid amount"),
            other => {
                tracing::error!(error = %other, "Failed to create payment intent");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create payment intent",
                )
            }
        })?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret.expose_secret().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!({ "amount": 1999 })), Some(1999));
        assert_eq!(parse_amount(&json!({ "amount": 50.0 })), Some(50));
        assert_eq!(parse_amount(&json!({ "amount": "75" })), Some(75));
        assert_eq!(parse_amount(&json!({ "amount": 19.5 })), None);
        assert_eq!(parse_amount(&json!({ "amount": "abc" })), None);
        assert_eq!(parse_amount(&json!({ "amount": null })), None);
        assert_eq!(parse_amount(&json!({})), None);
    }
}
