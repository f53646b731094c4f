//! Promotion documents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cnb_core::forms::{MAX_PROMOTION_IMAGES, NewPromotion};
use cnb_core::{DiscountType, FormError, ProductId, PromotionId, UserUid, is_live};

/// A document in the `promotions` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: PromotionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub minimum_purchase: Decimal,
    #[serde(default)]
    pub active: bool,
    pub created_by: UserUid,
    pub product_id: ProductId,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    #[must_use]
    pub fn create(input: NewPromotion, created_by: UserUid, now: DateTime<Utc>) -> Self {
        Self {
            id: PromotionId::generate(),
            name: input.name,
            description: input.description,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            start_date: input.start_date,
            end_date: input.end_date,
            minimum_purchase: input.minimum_purchase,
            active: input.active,
            created_by,
            product_id: input.product_id,
            images: input.images,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an edit, appending new images.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] if the merged image list exceeds the limit.
    pub fn apply(&mut self, input: NewPromotion, now: DateTime<Utc>) -> Result<(), FormError> {
        let mut images = self.images.clone();
        for url in input.images {
            if !images.contains(&url) {
                images.push(url);
            }
        }
        if images.len() > MAX_PROMOTION_IMAGES {
            return Err(FormError {
                field: "images",
                message: format!("at most {MAX_PROMOTION_IMAGES} images are allowed"),
            });
        }

        self.name = input.name;
        self.description = input.description;
        self.discount_type = input.discount_type;
        self.discount_value = input.discount_value;
        self.start_date = input.start_date;
        self.end_date = input.end_date;
        self.minimum_purchase = input.minimum_purchase;
        self.active = input.active;
        self.product_id = input.product_id;
        self.images = images;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the promotion is running at `now`.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        is_live(self.active, self.start_date, self.end_date, now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn input(images: usize) -> NewPromotion {
        let start = Utc::now();
        NewPromotion {
            name: "Spring".into(),
            description: String::new(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            start_date: start,
            end_date: start + Duration::days(3),
            minimum_purchase: Decimal::ZERO,
            active: true,
            product_id: ProductId::new("p1"),
            images: (0..images).map(|i| format!("https://img/{i}.png")).collect(),
        }
    }

    #[test]
    fn test_merged_images_respect_limit() {
        let now = Utc::now();
        let mut promotion = Promotion::create(input(10), UserUid::new("admin"), now);

        let mut more = input(0);
        more.images = (10..16).map(|i| format!("https://img/{i}.png")).collect();
        let err = promotion.apply(more, now).unwrap_err();
        assert_eq!(err.field, "images");
        assert_eq!(promotion.images.len(), 10);

        let mut fits = input(0);
        fits.images = (10..15).map(|i| format!("https://img/{i}.png")).collect();
        promotion.apply(fits, now).unwrap();
        assert_eq!(promotion.images.len(), 15);
    }

    #[test]
    fn test_is_live_at() {
        let promotion = Promotion::create(input(0), UserUid::new("admin"), Utc::now());
        assert!(promotion.is_live_at(promotion.start_date + Duration::hours(1)));
        assert!(!promotion.is_live_at(promotion.end_date + Duration::hours(1)));
    }
}
