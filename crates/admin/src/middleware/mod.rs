//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. [`RequireUser`] extractor on every session-authenticated handler

pub mod auth;
pub mod session;

pub use auth::{RequireUser, clear_current_user, set_current_user};
pub use session::{SessionStoreError, create_session_layer};
