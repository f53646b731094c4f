//! Authentication extractors for admin.
//!
//! The session only remembers who signed in. The role is re-read from the
//! `users` collection on every request, so a demotion takes effect on the
//! next call rather than at the next login.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use cnb_core::{Action, authorize};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor for a signed-in user allowed to use the dashboard.
///
/// Rejects with 401 when there is no session or the user document is gone,
/// and with 403 when the stored role no longer grants dashboard access.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> Result<String, AppError> {
///     user.require(Action::ManageCatalog)?;
///     Ok(format!("Hello, {}!", user.name))
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

        let signed_in: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

        let Some(user) = UserRepository::new(state.pool()).get(&signed_in.uid).await? else {
            clear_current_user(session).await?;
            return Err(AppError::Unauthorized("User not found".to_string()));
        };

        let current = CurrentUser {
            role: user.role,
            ..signed_in
        };
        current.require(Action::AccessDashboard)?;

        set_sentry_user(current.uid.as_str(), Some(&current.email));
        Ok(Self(current))
    }
}

impl CurrentUser {
    /// Check the user's role against `action`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the role does not allow it.
    pub fn require(&self, action: Action) -> Result<(), AppError> {
        authorize(self.role, action).map_err(|e| {
            tracing::warn!(uid = %self.uid, role = %self.role, ?action, "Action denied");
            AppError::from(e)
        })
    }
}

/// Store the signed-in user in the session.
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

/// Clear the signed-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
