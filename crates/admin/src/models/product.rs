//! Product documents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cnb_core::forms::NewProduct;
use cnb_core::{CategoryId, NodeId, ProductId};

/// A document in the `products` collection.
///
/// Category references are plain ids with no referential integrity; deleting
/// a category nulls them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub subcategory: Option<NodeId>,
    #[serde(default)]
    pub subsubcategory: Option<NodeId>,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a new document from a validated payload.
    #[must_use]
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::generate(),
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            category: input.category,
            subcategory: input.subcategory,
            subsubcategory: input.subsubcategory,
            images: input.images,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an edit. New image URLs are appended to the existing ones.
    pub fn apply(&mut self, input: NewProduct, now: DateTime<Utc>) {
        self.name = input.name;
        self.description = input.description;
        self.price = input.price;
        self.stock = input.stock;
        self.category = input.category;
        self.subcategory = input.subcategory;
        self.subsubcategory = input.subsubcategory;
        for url in input.images {
            if !self.images.contains(&url) {
                self.images.push(url);
            }
        }
        self.updated_at = now;
    }
}
