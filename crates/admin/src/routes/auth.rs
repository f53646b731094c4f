//! Session authentication routes.
//!
//! Passwords are checked by the identity provider; the admin API only keeps
//! the signed-in user in a server-side session.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use cnb_core::Action;

use crate::db::UserRepository;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::IdentityError;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Sign in with email and password.
///
/// POST /api/auth/login
#[instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<CurrentUser>, AppError> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".to_string()));
    }

    let signed_in = match state.identity().sign_in_with_password(email, &body.password).await {
        Ok(signed_in) => signed_in,
        Err(IdentityError::InvalidCredentials) => {
            tracing::info!("Login rejected: invalid credentials");
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let user = UserRepository::new(state.pool())
        .get(&signed_in.uid)
        .await?
        .ok_or_else(|| AppError::Forbidden("User not found".to_string()))?;

    let current = CurrentUser {
        uid: user.uid.clone(),
        email: user.email.clone(),
        name: user.display_name().to_string(),
        role: user.role,
    };
    current.require(Action::AccessDashboard)?;

    set_current_user(&session, &current).await?;
    set_sentry_user(current.uid.as_str(), Some(&current.email));
    tracing::info!(uid = %current.uid, role = %current.role, "User signed in");

    Ok(Json(current))
}

/// Clear the session.
///
/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, with the role as currently stored.
///
/// GET /api/auth/me
#[instrument(skip_all)]
pub async fn me(RequireUser(user): RequireUser) -> Json<CurrentUser> {
    Json(user)
}
