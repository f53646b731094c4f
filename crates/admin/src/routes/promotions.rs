//! Promotion routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use tracing::instrument;

use cnb_core::forms::NewPromotion;
use cnb_core::{Action, PromotionId};

use crate::{
    db::{ProductRepository, PromotionRepository},
    error::AppError,
    middleware::RequireUser,
    models::Promotion,
    state::AppState,
};

/// Build the promotions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/promotions", get(index).post(create))
        .route("/api/promotions/{id}", get(show).put(update).delete(destroy))
}

async fn check_product(state: &AppState, input: &NewPromotion) -> Result<(), AppError> {
    if ProductRepository::new(state.pool())
        .exists(&input.product_id)
        .await?
    {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "productId: product {} does not exist",
            input.product_id
        )))
    }
}

/// GET /api/promotions
#[instrument(skip_all)]
pub async fn index(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Promotion>>, AppError> {
    Ok(Json(PromotionRepository::new(state.pool()).list().await?))
}

/// GET /api/promotions/{id}
#[instrument(skip(_user, state))]
pub async fn show(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
) -> Result<Json<Promotion>, AppError> {
    let promotion = PromotionRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("promotion {id}")))?;
    Ok(Json(promotion))
}

/// POST /api/promotions
#[instrument(skip_all)]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(input): Json<NewPromotion>,
) -> Result<(StatusCode, Json<Promotion>), AppError> {
    user.require(Action::ManageCatalog)?;
    let input = input.validate()?;
    check_product(&state, &input).await?;

    let promotion = Promotion::create(input, user.uid.clone(), Utc::now());
    PromotionRepository::new(state.pool()).insert(&promotion).await?;

    tracing::info!(promotion_id = %promotion.id, uid = %user.uid, "Promotion created");
    Ok((StatusCode::CREATED, Json(promotion)))
}

/// Update a promotion. New image URLs are appended to the existing ones.
///
/// PUT /api/promotions/{id}
#[instrument(skip(user, state, input))]
pub async fn update(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
    Json(input): Json<NewPromotion>,
) -> Result<Json<Promotion>, AppError> {
    user.require(Action::ManageCatalog)?;
    let input = input.validate()?;

    let repo = PromotionRepository::new(state.pool());
    let mut promotion = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("promotion {id}")))?;
    check_product(&state, &input).await?;

    promotion.apply(input, Utc::now())?;
    repo.update(&promotion).await?;

    tracing::info!(promotion_id = %id, uid = %user.uid, "Promotion updated");
    Ok(Json(promotion))
}

/// Delete a promotion's images, then the promotion.
///
/// DELETE /api/promotions/{id}
#[instrument(skip(user, state))]
pub async fn destroy(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<PromotionId>,
) -> Result<StatusCode, AppError> {
    user.require(Action::ManageCatalog)?;

    let repo = PromotionRepository::new(state.pool());
    let promotion = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("promotion {id}")))?;

    state.storage().delete_all(&promotion.images).await?;
    repo.delete(&id).await?;

    tracing::info!(promotion_id = %id, uid = %user.uid, "Promotion deleted");
    Ok(StatusCode::NO_CONTENT)
}
