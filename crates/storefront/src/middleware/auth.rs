//! Authentication extractors.
//!
//! [`RequireUser`] puts the session guard in front of a handler: it answers
//! with a loading page until the auth provider is ready, redirects anonymous
//! shoppers to the login page (or returns 401 under `/api/`), and otherwise
//! yields the signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{Method, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::session::{GuardDecision, evaluate};
use crate::state::AppState;

/// Seconds a client should wait before retrying while auth state loads.
const LOADING_RETRY_AFTER_SECS: &str = "1";

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Why [`RequireUser`] refused a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Auth state is still loading.
    Loading { api: bool },
    /// Redirect to the login page (HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (API requests).
    Unauthorized,
}

#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
struct LoadingTemplate;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading { api } => {
                let retry = [(header::RETRY_AFTER, LOADING_RETRY_AFTER_SECS)];
                if api {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        retry,
                        Json(json!({ "error": "Loading" })),
                    )
                        .into_response()
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, retry, LoadingTemplate).into_response()
                }
            }
            Self::RedirectToLogin(location) => Redirect::to(&location).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
        }
    }
}

/// The path the shopper asked for, before any router nesting.
fn requested_path(parts: &Parts) -> String {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path().to_owned(), |uri| uri.path().to_owned())
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = requested_path(parts);
        let is_api = path.starts_with("/api/");
        let user = session_user(parts).await;

        // Only a GET can be replayed after login.
        let return_to = if parts.method == Method::GET { path.as_str() } else { "" };

        match evaluate(state.session_state().is_loading(), user, return_to) {
            GuardDecision::Allow(user) => Ok(Self(user)),
            GuardDecision::Loading => Err(AuthRejection::Loading { api: is_api }),
            GuardDecision::Redirect(_) if is_api => Err(AuthRejection::Unauthorized),
            GuardDecision::Redirect(location) => Err(AuthRejection::RedirectToLogin(location)),
        }
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the signed-in user in the session.
///
/// The session id is rotated first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop everything in the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
