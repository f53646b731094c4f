//! Integration tests for stored catalog documents.
//!
//! Each test runs an editor form through submission and into the stored
//! document model, then checks the JSON that would be written.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::{NaiveDate, TimeZone, Utc};
use cnb_admin::models::{Product, Promotion};
use cnb_core::forms::{MAX_PROMOTION_IMAGES, ProductForm, PromotionForm};
use cnb_core::{DiscountType, UserUid};
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn image(n: usize) -> String {
    format!("https://firebasestorage.googleapis.com/v0/b/cnb/o/images%2F{n}.jpg?alt=media&token=t{n}")
}

fn categorized_form() -> ProductForm {
    ProductForm::new()
        .with_name("  Persian Runner ")
        .with_description("Hand-knotted wool")
        .with_price("249.90")
        .with_stock("4")
        .with_category("cat-1")
        .with_subcategory("sub-1")
        .with_subsubcategory("leaf-1")
}

// =============================================================================
// Products
// =============================================================================

#[test]
fn test_new_product_document_shape() {
    let input = categorized_form()
        .with_images([image(1)])
        .submit()
        .unwrap();
    let product = Product::create(input, Utc::now());

    let doc = serde_json::to_value(&product).unwrap();
    assert_eq!(doc["name"], "Persian Runner");
    assert_eq!(doc["price"], "249.90");
    assert_eq!(doc["stock"], 4);
    assert_eq!(doc["category"], "cat-1");
    assert_eq!(doc["subcategory"], "sub-1");
    assert_eq!(doc["subsubcategory"], "leaf-1");
    assert_eq!(doc["images"], json!([image(1)]));
}

#[test]
fn test_clearing_category_persists_explicit_nulls() {
    let mut product = Product::create(categorized_form().submit().unwrap(), Utc::now());

    let edit = categorized_form().with_category("").submit().unwrap();
    product.apply(edit, Utc::now());

    let doc = serde_json::to_value(&product).unwrap();
    let object = doc.as_object().unwrap();
    for field in ["category", "subcategory", "subsubcategory"] {
        assert_eq!(object.get(field), Some(&Value::Null), "{field}");
    }
}

#[test]
fn test_changing_subcategory_clears_sub_subcategory() {
    let mut product = Product::create(categorized_form().submit().unwrap(), Utc::now());

    let edit = categorized_form().with_subcategory("sub-2").submit().unwrap();
    product.apply(edit, Utc::now());

    assert_eq!(product.subcategory.as_ref().unwrap().as_str(), "sub-2");
    assert!(product.subsubcategory.is_none());
}

#[test]
fn test_product_edit_appends_images() {
    let input = categorized_form().with_images([image(1), image(2)]).submit().unwrap();
    let mut product = Product::create(input, Utc::now());

    let edit = categorized_form().with_images([image(2), image(3)]).submit().unwrap();
    product.apply(edit, Utc::now());

    assert_eq!(product.images, [image(1), image(2), image(3)]);
}

#[test]
fn test_stored_document_without_category_fields() {
    let doc = json!({
        "id": "p1",
        "name": "Doormat",
        "price": "19.99",
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-01T10:00:00Z"
    });

    let product: Product = serde_json::from_value(doc).unwrap();
    assert!(product.category.is_none());
    assert!(product.images.is_empty());
    assert_eq!(product.stock, 0);
    assert_eq!(product.price, Decimal::new(1999, 2));
}

// =============================================================================
// Promotions
// =============================================================================

fn promotion_form() -> PromotionForm {
    PromotionForm::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        .with_name("Summer Sale")
        .with_discount(DiscountType::Percentage, "15")
        .with_dates("2024-06-01", "2024-06-30")
        .with_product("p1")
}

#[test]
fn test_promotion_dates_are_midnight_utc() {
    let promotion = Promotion::create(
        promotion_form().submit().unwrap(),
        UserUid::new("admin-1"),
        Utc::now(),
    );

    assert_eq!(
        promotion.start_date,
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    );
    let doc = serde_json::to_value(&promotion).unwrap();
    assert_eq!(doc["createdBy"], "admin-1");
    assert_eq!(doc["productId"], "p1");
    assert_eq!(doc["minimumPurchase"], "0");
}

#[test]
fn test_promotion_liveness_window() {
    let promotion = Promotion::create(
        promotion_form().submit().unwrap(),
        UserUid::new("admin-1"),
        Utc::now(),
    );

    assert!(promotion.is_live_at(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()));
    assert!(!promotion.is_live_at(Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap()));
    assert!(!promotion.is_live_at(Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap()));
}

#[test]
fn test_promotion_image_limit_applies_to_merged_list() {
    let first: Vec<String> = (0..10).map(image).collect();
    let mut promotion = Promotion::create(
        promotion_form().with_images(first).submit().unwrap(),
        UserUid::new("admin-1"),
        Utc::now(),
    );

    let more: Vec<String> = (10..MAX_PROMOTION_IMAGES + 1).map(image).collect();
    let err = promotion
        .apply(promotion_form().with_images(more).submit().unwrap(), Utc::now())
        .unwrap_err();
    assert_eq!(err.field, "images");
    assert_eq!(promotion.images.len(), 10, "rejected edit leaves images alone");

    let within: Vec<String> = (5..MAX_PROMOTION_IMAGES).map(image).collect();
    promotion
        .apply(promotion_form().with_images(within).submit().unwrap(), Utc::now())
        .unwrap();
    assert_eq!(promotion.images.len(), MAX_PROMOTION_IMAGES);
}
