//! Bearer-authenticated account deletion.
//!
//! Backs `POST /api/functions/delete-user`. The handler is stateless: it
//! verifies the caller's ID token, re-reads the caller's role from the
//! `users` collection and deletes the target account from the identity
//! provider. The target's user document is left alone.

use std::future::Future;

use axum::http::StatusCode;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use cnb_core::{Action, Role, UserUid, authorize};

use crate::db::{RepositoryError, UserRepository};
use crate::services::identity::{DeleteOutcome, IdentityError, IdentityProvider};

/// Success message of the deletion endpoint.
pub const DELETED_MESSAGE: &str = "User deleted successfully";

/// Source of the acting user's current role.
pub trait RoleDirectory: Send + Sync {
    /// Role stored on the user's document, or `None` if there is no document.
    fn role_of(
        &self,
        uid: &UserUid,
    ) -> impl Future<Output = Result<Option<Role>, RepositoryError>> + Send;
}

impl RoleDirectory for PgPool {
    async fn role_of(&self, uid: &UserUid) -> Result<Option<Role>, RepositoryError> {
        Ok(UserRepository::new(self).get(uid).await?.map(|u| u.role))
    }
}

/// Rejections of the deletion endpoint, in the order they are checked.
#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("missing bearer token")]
    MissingBearer,

    #[error("invalid ID token")]
    InvalidToken,

    #[error("caller has no user document")]
    CallerNotFound,

    #[error("caller is not an administrator")]
    NotAdmin,

    #[error("missing userId")]
    MissingUserId,

    #[error("identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
}

impl DeletionError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingBearer | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::CallerNotFound | Self::NotAdmin => StatusCode::FORBIDDEN,
            Self::MissingUserId => StatusCode::BAD_REQUEST,
            Self::Identity(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingBearer | Self::InvalidToken => "Unauthorized",
            Self::CallerNotFound => "User not found",
            Self::NotAdmin => "Forbidden: Only administrators can delete users",
            Self::MissingUserId => "Missing userId in request body",
            Self::Identity(_) | Self::Database(_) => "Failed to delete user",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteUserBody {
    #[serde(default)]
    user_id: Option<String>,
}

/// Token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `userId` from the request body. A malformed body counts as missing.
fn target_uid(body: &[u8]) -> Option<UserUid> {
    serde_json::from_slice::<DeleteUserBody>(body)
        .ok()?
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(UserUid::new)
}

/// Run the deletion endpoint's checks and delete the target account.
///
/// # Errors
///
/// Returns the first failed check, or an internal error from a collaborator.
pub async fn delete_user<I, D>(
    identity: &I,
    directory: &D,
    authorization: Option<&str>,
    body: &[u8],
) -> Result<DeleteOutcome, DeletionError>
where
    I: IdentityProvider,
    D: RoleDirectory,
{
    let token = bearer_token(authorization).ok_or(DeletionError::MissingBearer)?;

    let caller = match identity.verify_id_token(token).await {
        Ok(verified) => verified.uid,
        Err(IdentityError::InvalidToken) => return Err(DeletionError::InvalidToken),
        Err(e) => return Err(e.into()),
    };

    let role = directory
        .role_of(&caller)
        .await?
        .ok_or(DeletionError::CallerNotFound)?;
    authorize(role, Action::DeleteUser).map_err(|_| DeletionError::NotAdmin)?;

    let target = target_uid(body).ok_or(DeletionError::MissingUserId)?;

    let outcome = identity.delete_account(&target).await?;
    tracing::info!(caller = %caller, target = %target, ?outcome, "User account deletion handled");
    Ok(outcome)
}
