//! Image upload route.
//!
//! Files are stored first; the caller then saves the returned URLs on the
//! owning product or promotion.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use cnb_core::Action;

use crate::{error::AppError, middleware::RequireUser, state::AppState};

/// Largest accepted upload request (all files together).
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the images router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/images", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}

/// Whether a part's content type is an image.
fn is_image(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().starts_with("image/"))
}

/// Upload one or more images.
///
/// POST /api/images (multipart; every file part is stored)
#[instrument(skip_all)]
pub async fn upload(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    user.require(Action::ManageCatalog)?;

    let mut urls = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        if !is_image(&content_type) {
            return Err(AppError::BadRequest(format!(
                "{file_name}: only image files can be uploaded"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read {file_name}: {e}")))?;

        let stored = state
            .storage()
            .upload(&file_name, &content_type, bytes.to_vec(), Utc::now().timestamp_millis())
            .await?;
        urls.push(stored.download_url);
    }

    if urls.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    tracing::info!(uid = %user.uid, count = urls.len(), "Images uploaded");
    Ok(Json(UploadResponse { urls }))
}
