//! User repository for database operations.
//!
//! Accounts and their Argon2 password hashes live in `storefront.user`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query_as};
use tracing::instrument;

use bramble_core::{Email, UserId};

use super::StoreError;
use crate::models::User;
use crate::services::auth::CredentialStore;

const CREATE_USER_SQL: &str = r#"
    INSERT INTO storefront."user" (id, email, password_hash)
    VALUES ($1, $2, $3)
    RETURNING id, email, password_hash, created_at
"#;

const FIND_BY_EMAIL_SQL: &str = r#"
    SELECT id, email, password_hash, created_at
    FROM storefront."user"
    WHERE email = $1
"#;

struct UserRow {
    id: UserId,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), StoreError> {
        let email = Email::parse(&self.email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok((
            User {
                id: self.id,
                email,
                created_at: self.created_at,
            },
            self.password_hash,
        ))
    }
}

/// Credential store backed by `storefront.user`.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip(self, password_hash))]
    async fn create_user(&self, email: &Email, password_hash: &str) -> Result<User, StoreError> {
        let row = query_as::<Postgres, UserRow>(CREATE_USER_SQL)
            .bind(UserId::generate())
            .bind(email.as_str())
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await?;

        row.into_user().map(|(user, _)| user)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<(User, String)>, StoreError> {
        let row = query_as::<Postgres, UserRow>(FIND_BY_EMAIL_SQL)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }
}
