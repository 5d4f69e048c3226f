//! Access control for protected views.

use crate::models::CurrentUser;

/// Where to send a shopper after sign-in when no destination was requested.
pub const DEFAULT_LANDING: &str = "/store";

/// Outcome of checking a request against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth state not known yet; show a loading view.
    Loading,
    /// Not signed in; redirect to this login URL.
    Redirect(String),
    /// Signed in.
    Allow(CurrentUser),
}

/// Decide whether a request for `requested_path` may proceed.
#[must_use]
pub fn evaluate(loading: bool, user: Option<CurrentUser>, requested_path: &str) -> GuardDecision {
    if loading {
        return GuardDecision::Loading;
    }
    match user {
        Some(user) => GuardDecision::Allow(user),
        None => GuardDecision::Redirect(login_redirect(requested_path)),
    }
}

/// Login URL that returns to `path` after sign-in.
///
/// ```
/// use bramble_storefront::session::login_redirect;
///
/// assert_eq!(login_redirect("/cart"), "/login?next=%2Fcart");
/// assert_eq!(login_redirect(""), "/login?next=%2Fstore");
/// ```
#[must_use]
pub fn login_redirect(path: &str) -> String {
    let path = if path.is_empty() { DEFAULT_LANDING } else { path };
    format!("/login?next={}", urlencoding::encode(path))
}

/// Validate a post-login destination. Only same-site absolute paths are
/// accepted; anything else lands on the store.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains("://") =>
        {
            path
        }
        _ => DEFAULT_LANDING,
    }
}
