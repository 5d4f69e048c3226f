//! Session-related types.
//!
//! Types stored in the server-side session.

use serde::{Deserialize, Serialize};

use bramble_core::{Email, UserId};

use super::User;

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// A paid checkout waiting for card confirmation.
    pub const PENDING_CHECKOUT: &str = "pending_checkout";
}
