//! Bearer-authenticated function endpoints.
//!
//! These are called by the dashboard with the signed-in user's ID token
//! rather than a session cookie.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::instrument;

use crate::services::user_deletion::{DELETED_MESSAGE, DeletionError, delete_user};
use crate::state::AppState;

/// Build the functions router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/functions/delete-user", post(delete_user_function))
}

impl IntoResponse for DeletionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "User deletion failed");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "User deletion rejected");
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

/// Delete a user's identity account.
///
/// POST /api/functions/delete-user with `Authorization: Bearer <id token>`
/// and body `{"userId": "..."}`. An account that is already gone counts as
/// deleted.
#[instrument(skip_all)]
pub async fn delete_user_function(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), DeletionError> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    delete_user(state.identity(), state.pool(), authorization, &body).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": DELETED_MESSAGE })),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejection_body() {
        let response = DeletionError::NotAdmin.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "Forbidden: Only administrators can delete users" })
        );
    }
}
