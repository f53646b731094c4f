//! Session middleware configuration for admin.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions
//! (SameSite=Strict, 7 day inactivity expiry).

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::CnbConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "cnb_admin_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Error creating the session store.
#[derive(Debug, thiserror::Error)]
#[error("invalid session store identifier: {0}")]
pub struct SessionStoreError(String);

/// Create the session layer with `PostgreSQL` store.
///
/// # Errors
///
/// Returns an error if the schema or table name is rejected by the store.
pub fn create_session_layer(
    pool: &PgPool,
    config: &CnbConfig,
) -> Result<SessionManagerLayer<PostgresStore>, SessionStoreError> {
    // Table is created by migration in the cnb schema.
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("cnb")
        .map_err(|e| SessionStoreError(e.to_string()))?
        .with_table_name("session")
        .map_err(|e| SessionStoreError(e.to_string()))?;

    let is_secure = config.base_url.starts_with("https://");

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/"))
}
