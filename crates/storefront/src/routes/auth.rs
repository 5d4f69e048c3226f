//! Authentication route handlers.
//!
//! Email and password sign-in against the configured [`AuthProvider`]. A
//! successful sign-in or sign-up stores the user in the session, publishes the
//! change to session subscribers, and returns the shopper to the page they
//! originally asked for.
//!
//! [`AuthProvider`]: crate::services::auth::AuthProvider

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::Nav;
use crate::services::auth::AuthError;
use crate::session::{DEFAULT_LANDING, safe_next};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub next: Option<String>,
}

/// Query parameters for the auth pages.
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub next: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

fn auth_failure(err: AuthError) -> AppError {
    if matches!(err, AuthError::Store(_) | AuthError::PasswordHash) {
        tracing::error!(error = %err, "Authentication backend failed");
    } else {
        tracing::warn!(error = %err, "Authentication rejected");
    }
    AppError::Auth(err)
}

/// Put the user in the session and tell everyone who is listening.
async fn sign_in_session(state: &AppState, session: &Session, user: &User) -> Result<(), AppError> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    state.session_state().publish(Some(current));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. A signed-in shopper goes straight on.
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<AuthQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if user.is_some() {
        return Redirect::to(&next).into_response();
    }

    LoginTemplate {
        nav: Nav::default(),
        email: String::new(),
        next,
        error: query.error,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    let result = match state.auth().sign_in(&form.email, &form.password).await {
        Ok(user) => sign_in_session(&state, &session, &user).await,
        Err(e) => Err(auth_failure(e)),
    };

    match result {
        Ok(()) => Redirect::to(&next).into_response(),
        Err(err) => {
            let page = LoginTemplate {
                nav: Nav::default(),
                email: form.email,
                next,
                error: Some(err.user_message()),
            };
            (err.status(), page).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<AuthQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    if user.is_some() {
        return Redirect::to(&next).into_response();
    }

    RegisterTemplate {
        nav: Nav::default(),
        email: String::new(),
        next,
        error: query.error,
    }
    .into_response()
}

/// Handle registration form submission. A new account is signed in at once.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    let result = if form.password == form.password_confirm {
        match state.auth().sign_up(&form.email, &form.password).await {
            Ok(user) => sign_in_session(&state, &session, &user).await,
            Err(e) => Err(auth_failure(e)),
        }
    } else {
        Err(AppError::BadRequest("Passwords do not match".to_string()))
    };

    match result {
        Ok(()) => Redirect::to(&next).into_response(),
        Err(err) => {
            let page = RegisterTemplate {
                nav: Nav::default(),
                email: form.email,
                next,
                error: Some(err.user_message()),
            };
            (err.status(), page).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and return to the store.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    state.session_state().publish(None);

    Redirect::to(DEFAULT_LANDING).into_response()
}
