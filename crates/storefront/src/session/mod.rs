//! Process-wide authentication state.
//!
//! [`SessionState`] is created once at start-up and injected into the
//! application state. It starts out *loading*; once the auth provider is ready
//! the server resolves it, and every sign-in or sign-out afterwards pushes a new
//! snapshot. Consumers either read the latest snapshot or subscribe to changes.

pub mod guard;

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::CurrentUser;

pub use guard::{DEFAULT_LANDING, GuardDecision, evaluate, login_redirect, safe_next};

/// The latest known authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The user of the most recent transition, if any.
    pub user: Option<CurrentUser>,
    /// `true` until the auth provider has initialised.
    pub loading: bool,
}

impl SessionSnapshot {
    const fn loading() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

/// Shared, observable authentication state.
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Create state in the loading phase.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::loading());
        Self { tx: Arc::new(tx) }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Whether the initial state is still being resolved.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    /// Finish loading with the given user (usually `None` at start-up).
    pub fn resolve(&self, user: Option<CurrentUser>) {
        self.publish(user);
    }

    /// Push a transition. Also ends the loading phase.
    pub fn publish(&self, user: Option<CurrentUser>) {
        self.tx.send_replace(SessionSnapshot {
            user,
            loading: false,
        });
    }

    /// Subscribe to future transitions.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription to [`SessionState`].
///
/// Dropping the subscription, or calling [`SessionSubscription::unsubscribe`],
/// stops delivery.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionSubscription {
    /// Wait for the next transition and return it.
    ///
    /// Returns `None` once the state has been dropped.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Latest snapshot without waiting.
    #[must_use]
    pub fn latest(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    /// Stop receiving transitions.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
