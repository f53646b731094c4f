//! Category tree routes.
//!
//! Top-level categories are addressed by document id; nested nodes by the
//! owning category id plus the node id.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cnb_core::forms::NewCategory;
use cnb_core::{Action, CategoryId, MoveDirection, NodeId};

use crate::{
    db::CategoryRepository, error::AppError, middleware::RequireUser, models::Category,
    state::AppState,
};

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(index).post(create))
        .route("/api/categories/{id}", get(show).patch(rename).delete(destroy))
        .route("/api/categories/{id}/move", post(move_entry))
        .route("/api/categories/{id}/nodes/{node_id}", delete(destroy_node))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
    /// Nested node to rename; the category itself when absent.
    #[serde(default)]
    pub node: Option<NodeId>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: MoveDirection,
    #[serde(default)]
    pub node: Option<NodeId>,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    /// Ids whose `order` changed; empty when already at the edge.
    pub changed: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub products_cleared: u64,
}

async fn load(repo: &CategoryRepository<'_>, id: &CategoryId) -> Result<Category, AppError> {
    repo.get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))
}

/// All categories in display order.
///
/// GET /api/categories
#[instrument(skip_all)]
pub async fn index(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// GET /api/categories/{id}
#[instrument(skip(_user, state))]
pub async fn show(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(load(&CategoryRepository::new(state.pool()), &id).await?))
}

/// Create a category, subcategory or sub-subcategory.
///
/// Returns the affected top-level category.
///
/// POST /api/categories
#[instrument(skip(user, state))]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(input): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    user.require(Action::ManageCatalog)?;
    let input = input.validate()?;
    let repo = CategoryRepository::new(state.pool());

    let category = match &input.parent_category {
        None => repo.create(input.name).await?,
        Some(parent) => {
            let node = repo
                .add_node(parent, input.parent_subcategory.as_ref(), &input.name)
                .await??;
            tracing::info!(category_id = %parent, node_id = %node, "Category node created");
            load(&repo, parent).await?
        }
    };

    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/categories/{id}
#[instrument(skip(user, state))]
pub async fn rename(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<RenameRequest>,
) -> Result<Json<Category>, AppError> {
    user.require(Action::ManageCatalog)?;
    let repo = CategoryRepository::new(state.pool());

    repo.rename(&id, body.node.as_ref(), &body.name).await??;
    Ok(Json(load(&repo, &id).await?))
}

/// Move a category, or one of its nested nodes, one place up or down.
///
/// POST /api/categories/{id}/move
#[instrument(skip(user, state))]
pub async fn move_entry(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    user.require(Action::ManageCatalog)?;
    let repo = CategoryRepository::new(state.pool());

    let changed = match &body.node {
        None => repo.move_category(&id, body.direction).await?,
        Some(node) => repo.move_node(&id, node, body.direction).await??,
    };
    Ok(Json(MoveResponse { changed }))
}

/// Delete a top-level category and clear product references to it.
///
/// DELETE /api/categories/{id}
#[instrument(skip(user, state))]
pub async fn destroy(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<DeleteResponse>, AppError> {
    user.require(Action::ManageCatalog)?;
    let products_cleared = CategoryRepository::new(state.pool())
        .delete_category(&id)
        .await?;
    Ok(Json(DeleteResponse { products_cleared }))
}

/// Delete a subcategory or sub-subcategory.
///
/// DELETE /api/categories/{id}/nodes/{node_id}
#[instrument(skip(user, state))]
pub async fn destroy_node(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path((id, node_id)): Path<(CategoryId, NodeId)>,
) -> Result<Json<DeleteResponse>, AppError> {
    user.require(Action::ManageCatalog)?;
    let products_cleared = CategoryRepository::new(state.pool())
        .delete_node(&id, &node_id)
        .await?;
    Ok(Json(DeleteResponse { products_cleared }))
}
