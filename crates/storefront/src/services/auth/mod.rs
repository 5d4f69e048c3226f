//! Authentication service.
//!
//! Email + password accounts, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::instrument;

use bramble_core::Email;

use crate::db::StoreError;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Signs shoppers up and in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Check credentials and return the account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;
}

/// Storage for accounts and their password hashes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create an account. Fails with `StoreError::Conflict` if the email is taken.
    async fn create_user(&self, email: &Email, password_hash: &str) -> Result<User, StoreError>;

    /// Look up an account and its password hash.
    async fn find_by_email(&self, email: &Email) -> Result<Option<(User, String)>, StoreError>;
}

/// Password authentication over a [`CredentialStore`].
pub struct AuthService<C> {
    store: C,
}

impl<C: CredentialStore> AuthService<C> {
    #[must_use]
    pub const fn new(store: C) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<C: CredentialStore> AuthProvider for AuthService<C> {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(&email, &password_hash)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::{always, eq};

    use super::*;
    use bramble_core::UserId;

    fn user(email: &Email) -> User {
        User {
            id: UserId::generate(),
            email: email.clone(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let mut store = MockCredentialStore::new();
        store.expect_create_user().never();

        let result = AuthService::new(store).sign_up("a@b.co", "short").await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn test_sign_up_normalises_email_and_maps_conflict() {
        let mut store = MockCredentialStore::new();
        store
            .expect_create_user()
            .with(eq(Email::parse("ada@example.com").unwrap()), always())
            .returning(|_, _| Err(StoreError::Conflict("user_email_key".to_string())));

        let result = AuthService::new(store)
            .sign_up(" Ada@Example.com ", "long enough")
            .await;
        assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_sign_in_unknown_email_is_invalid_credentials() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));

        let result = AuthService::new(store)
            .sign_in("nobody@example.com", "whatever1")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let email = Email::parse("ada@example.com").unwrap();
        let account = user(&email);
        let hash = hash_password("analytical engine").unwrap();

        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some((account.clone(), hash.clone()))));
        let auth = AuthService::new(store);

        assert!(auth.sign_in("ada@example.com", "analytical engine").await.is_ok());
        assert!(matches!(
            auth.sign_in("ada@example.com", "difference engine").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
