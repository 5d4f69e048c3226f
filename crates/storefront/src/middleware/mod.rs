//! HTTP middleware and extractors for the storefront.
//!
//! # Layer order (outermost first)
//!
//! 1. Sentry (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions)

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, OptionalUser, RequireUser, clear_current_user, set_current_user,
};
pub use session::create_session_layer;
