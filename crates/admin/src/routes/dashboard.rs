//! Dashboard route handler.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use crate::{
    db::{CategoryRepository, ProductRepository, PromotionRepository},
    error::AppError,
    middleware::RequireUser,
    models::{Product, Promotion},
    state::AppState,
};

/// Number of recent records shown per list.
const RECENT_LIMIT: usize = 5;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(index))
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub products: i64,
    pub categories: i64,
    pub promotions: usize,
    pub active_promotions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub recent_products: Vec<Product>,
    pub recent_promotions: Vec<Promotion>,
}

/// Newest promotions first, at most `limit`.
fn most_recent(mut promotions: Vec<Promotion>, limit: usize) -> Vec<Promotion> {
    promotions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    promotions.truncate(limit);
    promotions
}

/// Dashboard overview.
///
/// GET /api/dashboard
#[instrument(skip_all)]
pub async fn index(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let products = ProductRepository::new(state.pool());
    let promotions = PromotionRepository::new(state.pool()).list().await?;

    let now = Utc::now();
    let counts = DashboardCounts {
        products: products.count().await?,
        categories: CategoryRepository::new(state.pool()).count().await?,
        promotions: promotions.len(),
        active_promotions: promotions.iter().filter(|p| p.is_live_at(now)).count(),
    };

    #[allow(clippy::cast_possible_wrap)]
    let recent_products = products.recent(RECENT_LIMIT as i64).await?;

    Ok(Json(DashboardResponse {
        counts,
        recent_products,
        recent_promotions: most_recent(promotions, RECENT_LIMIT),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, TimeZone};
    use cnb_core::forms::NewPromotion;
    use cnb_core::{DiscountType, ProductId, UserUid};
    use rust_decimal::Decimal;

    use super::*;

    fn promotion(name: &str, created_days_ago: i64) -> Promotion {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let input = NewPromotion {
            name: name.to_string(),
            description: String::new(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::TEN,
            start_date: now,
            end_date: now,
            minimum_purchase: Decimal::ZERO,
            active: true,
            product_id: ProductId::new("p1"),
            images: vec![],
        };
        Promotion::create(input, UserUid::new("admin"), now - Duration::days(created_days_ago))
    }

    #[test]
    fn test_most_recent_orders_newest_first() {
        let all = (0..8).map(|i| promotion(&format!("p{i}"), i)).rev().collect();
        let recent = most_recent(all, RECENT_LIMIT);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].name, "p0");
        assert_eq!(recent[4].name, "p4");
    }
}
