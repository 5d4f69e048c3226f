//! User domain types.

use chrono::{DateTime, Utc};

use bramble_core::{Email, UserId};

/// A storefront account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalised email address.
    pub email: Email,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
