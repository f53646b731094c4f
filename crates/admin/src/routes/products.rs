//! Product routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use tracing::instrument;

use cnb_core::category::validate_selection;
use cnb_core::forms::NewProduct;
use cnb_core::listing::{ListQuery, ProductSort, compare_text, search_and_sort};
use cnb_core::{Action, NodeId, ProductId};

use crate::{
    db::{CategoryRepository, ProductRepository},
    error::AppError,
    middleware::RequireUser,
    models::Product,
    state::AppState,
};

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(index).post(create))
        .route("/api/products/{id}", get(show).put(update).delete(destroy))
}

/// Search and sort a product list.
#[must_use]
pub fn filter_products(products: Vec<Product>, query: &ListQuery<ProductSort>) -> Vec<Product> {
    let sort = query.sort;
    let dir = query.dir;
    search_and_sort(
        products,
        query.term(),
        |p| vec![p.name.as_str(), p.description.as_str()],
        |a, b| {
            let ordering = match sort {
                ProductSort::Name => compare_text(&a.name, &b.name),
                ProductSort::Price => a.price.cmp(&b.price),
                ProductSort::Stock => a.stock.cmp(&b.stock),
            };
            dir.apply(ordering)
        },
    )
}

/// Check the payload's category selection against the stored tree.
async fn check_categories(state: &AppState, input: &NewProduct) -> Result<(), AppError> {
    let Some(category_id) = &input.category else {
        return Ok(());
    };

    let category = CategoryRepository::new(state.pool())
        .get(category_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("category: {category_id} does not exist")))?;

    validate_selection(
        &category.sub_categories,
        input.subcategory.as_ref().map(NodeId::as_str),
        input.subsubcategory.as_ref().map(NodeId::as_str),
    )?;
    Ok(())
}

/// List products.
///
/// GET /api/products?q=&sort=name|price|stock&dir=asc|desc
#[instrument(skip(_user, state))]
pub async fn index(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery<ProductSort>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(filter_products(products, &query)))
}

/// GET /api/products/{id}
#[instrument(skip(_user, state))]
pub async fn show(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    let product = ProductRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(product))
}

/// POST /api/products
#[instrument(skip_all)]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    user.require(Action::ManageCatalog)?;
    let input = input.validate()?;
    check_categories(&state, &input).await?;

    let product = Product::create(input, Utc::now());
    ProductRepository::new(state.pool()).insert(&product).await?;

    tracing::info!(product_id = %product.id, uid = %user.uid, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product. New image URLs are appended to the existing ones.
///
/// PUT /api/products/{id}
#[instrument(skip(user, state, input))]
pub async fn update(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<NewProduct>,
) -> Result<Json<Product>, AppError> {
    user.require(Action::ManageCatalog)?;
    let input = input.validate()?;

    let repo = ProductRepository::new(state.pool());
    let mut product = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    check_categories(&state, &input).await?;

    product.apply(input, Utc::now());
    repo.update(&product).await?;

    tracing::info!(product_id = %id, uid = %user.uid, "Product updated");
    Ok(Json(product))
}

/// Delete a product's images, then the product.
///
/// DELETE /api/products/{id}
#[instrument(skip(user, state))]
pub async fn destroy(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    user.require(Action::ManageCatalog)?;

    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    state.storage().delete_all(&product.images).await?;
    repo.delete(&id).await?;

    tracing::info!(product_id = %id, uid = %user.uid, images = product.images.len(), "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use cnb_core::listing::SortDirection;
    use rust_decimal::Decimal;

    use super::*;

    fn product(name: &str, description: &str, price: i64, stock: u32) -> Product {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Product::create(
            NewProduct {
                name: name.to_string(),
                description: description.to_string(),
                price: Decimal::from(price),
                stock,
                category: None,
                subcategory: None,
                subsubcategory: None,
                images: vec![],
            },
            now,
        )
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("Kilim", "flat woven", 300, 4),
            product("axminster", "cut pile", 120, 10),
            product("Berber", "loop pile WOOL", 200, 0),
        ]
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let sorted = filter_products(catalog(), &ListQuery::default());
        assert_eq!(names(&sorted), ["axminster", "Berber", "Kilim"]);
    }

    #[test]
    fn test_sort_by_price_desc() {
        let query = ListQuery {
            q: None,
            sort: ProductSort::Price,
            dir: SortDirection::Desc,
        };
        assert_eq!(names(&filter_products(catalog(), &query)), ["Kilim", "Berber", "axminster"]);
    }

    #[test]
    fn test_search_matches_description() {
        let query = ListQuery {
            q: Some("pile".to_string()),
            sort: ProductSort::Stock,
            dir: SortDirection::Asc,
        };
        assert_eq!(names(&filter_products(catalog(), &query)), ["Berber", "axminster"]);

        let query = ListQuery {
            q: Some("wool".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(names(&filter_products(catalog(), &query)), ["Berber"]);
    }
}
