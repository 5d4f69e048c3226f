//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. Route handlers return
//! `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::db::StoreError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::payments::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart, order or account storage failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Product catalog request failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Payment provider failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Checkout stopped.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => store_status(err),
            Self::Catalog(CatalogError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Payment(err) => payment_status(err),
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::IncompleteShipping(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CheckoutError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
                CheckoutError::PaymentSetupFailed(err) => payment_status(err),
                CheckoutError::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::OrderPersistFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::Storage(err) => store_status(err),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Store(err) => store_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the shopper. Internal details never leave the server.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(StoreError::InvalidInput(msg)) | Self::BadRequest(msg) => msg.clone(),
            Self::Store(StoreError::Unavailable(_)) => {
                "The store is temporarily unavailable. Please try again.".to_string()
            }
            Self::Catalog(CatalogError::NotFound(id)) => format!("Product {id} was not found"),
            Self::Catalog(_) => "Could not load products. Please try again.".to_string(),
            Self::Payment(PaymentError::InvalidAmount) => "Invalid amount".to_string(),
            Self::Payment(PaymentError::Declined(msg)) => msg.clone(),
            Self::Payment(PaymentError::NotConfigured) => {
                "Payments are not available".to_string()
            }
            Self::Payment(_) => "Payment provider error".to_string(),
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => "Your cart is empty.".to_string(),
                CheckoutError::IncompleteShipping(e) => format!("Please check your shipping details: {e}."),
                CheckoutError::PaymentSetupFailed(PaymentError::InvalidAmount) => {
                    "Order total is below the minimum card charge.".to_string()
                }
                CheckoutError::PaymentSetupFailed(_) => {
                    "Could not start payment. Please try again.".to_string()
                }
                CheckoutError::PaymentDeclined(msg) => msg.clone(),
                CheckoutError::PaymentProviderError(_) => {
                    "Your payment could not be confirmed. Please try again.".to_string()
                }
                CheckoutError::OrderPersistFailed {
                    payment_intent_id: Some(id),
                    ..
                } => format!(
                    "Your payment went through but we could not save your order. \
                     Please contact support with reference {id}."
                ),
                CheckoutError::OrderPersistFailed { .. } => {
                    "Could not save your order. Please try again.".to_string()
                }
                CheckoutError::Storage(_) => {
                    "Could not read your cart. Please try again.".to_string()
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

const fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Database(_) | StoreError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn payment_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::InvalidAmount => StatusCode::BAD_REQUEST,
        PaymentError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
        PaymentError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Provider(_) | PaymentError::Http(_) | PaymentError::MalformedClientSecret => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.user_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
