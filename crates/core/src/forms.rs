//! Form state for the product, promotion and category editors.
//!
//! Forms hold what the user typed (prices and dates as text) and are never
//! mutated in place: every `with_*` method consumes the form and returns the
//! updated value. `submit()` turns the form into the typed payload the API
//! accepts, or the first field-level error.
//!
//! The payload types (`NewProduct`, `NewPromotion`, `NewCategory`) are also
//! what the JSON endpoints deserialize, and their `validate()` is the single
//! validation path for both.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::category::clean_name;
use crate::types::{CategoryId, DiscountType, NodeId, ProductId};

/// Maximum number of images attached to a promotion.
pub const MAX_PROMOTION_IMAGES: usize = 15;

/// A validation failure tied to one form field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FormError {
    /// Wire name of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Treat `""` the same as a missing value.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(T::from))
}

fn non_empty<T: From<String>>(value: &str) -> Option<T> {
    let value = value.trim();
    (!value.is_empty()).then(|| T::from(value.to_owned()))
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, FormError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| FormError::new(field, "must be a number"))
}

/// Parse an `<input type="date">` value (or a full RFC 3339 timestamp).
///
/// Plain dates are midnight UTC.
fn parse_date(field: &'static str, raw: &str) -> Result<DateTime<Utc>, FormError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| FormError::new(field, "must be a date (YYYY-MM-DD)"))
}

// =============================================================================
// Products
// =============================================================================

/// Typed product payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<CategoryId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub subcategory: Option<NodeId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub subsubcategory: Option<NodeId>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewProduct {
    /// Field checks that need no database access.
    ///
    /// Tree membership of the selection is checked by the caller against the
    /// stored category (see [`crate::category::validate_selection`]).
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(mut self) -> Result<Self, FormError> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err(FormError::new("name", "is required"));
        }
        if self.price < Decimal::ZERO {
            return Err(FormError::new("price", "cannot be negative"));
        }
        if self.category.is_none() && self.subcategory.is_some() {
            return Err(FormError::new("subcategory", "requires a category"));
        }
        if self.subcategory.is_none() && self.subsubcategory.is_some() {
            return Err(FormError::new("subsubcategory", "requires a subcategory"));
        }
        Ok(self)
    }
}

/// Product editor state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    name: String,
    description: String,
    price: String,
    stock: String,
    category: Option<CategoryId>,
    subcategory: Option<NodeId>,
    subsubcategory: Option<NodeId>,
    images: Vec<String>,
}

impl ProductForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from a stored product for editing.
    #[must_use]
    pub fn from_product(product: &NewProduct) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            stock: product.stock.to_string(),
            category: product.category.clone(),
            subcategory: product.subcategory.clone(),
            subsubcategory: product.subsubcategory.clone(),
            images: product.images.clone(),
        }
    }

    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_price(self, price: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_stock(self, stock: impl Into<String>) -> Self {
        Self {
            stock: stock.into(),
            ..self
        }
    }

    /// Select a category. Clears the subcategory and sub-subcategory.
    #[must_use]
    pub fn with_category(self, category: &str) -> Self {
        Self {
            category: non_empty(category),
            subcategory: None,
            subsubcategory: None,
            ..self
        }
    }

    /// Select a subcategory. Clears the sub-subcategory.
    #[must_use]
    pub fn with_subcategory(self, subcategory: &str) -> Self {
        Self {
            subcategory: non_empty(subcategory),
            subsubcategory: None,
            ..self
        }
    }

    #[must_use]
    pub fn with_subsubcategory(self, subsubcategory: &str) -> Self {
        Self {
            subsubcategory: non_empty(subsubcategory),
            ..self
        }
    }

    /// Append uploaded image URLs.
    #[must_use]
    pub fn with_images(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.images.extend(urls);
        self
    }

    #[must_use]
    pub const fn category(&self) -> Option<&CategoryId> {
        self.category.as_ref()
    }

    #[must_use]
    pub const fn subcategory(&self) -> Option<&NodeId> {
        self.subcategory.as_ref()
    }

    #[must_use]
    pub const fn subsubcategory(&self) -> Option<&NodeId> {
        self.subsubcategory.as_ref()
    }

    /// Convert to a validated payload.
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn submit(&self) -> Result<NewProduct, FormError> {
        let price = parse_decimal("price", &self.price)?;
        let stock = self
            .stock
            .trim()
            .parse::<u32>()
            .map_err(|_| FormError::new("stock", "must be a whole number of at least 0"))?;

        NewProduct {
            name: self.name.clone(),
            description: self.description.trim().to_owned(),
            price,
            stock,
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            subsubcategory: self.subsubcategory.clone(),
            images: self.images.clone(),
        }
        .validate()
    }
}

// =============================================================================
// Promotions
// =============================================================================

/// Typed promotion payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromotion {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub minimum_purchase: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
    pub product_id: ProductId,
    #[serde(default)]
    pub images: Vec<String>,
}

const fn default_active() -> bool {
    true
}

impl NewPromotion {
    /// Field checks that need no database access. Product existence is
    /// checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(mut self) -> Result<Self, FormError> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err(FormError::new("name", "is required"));
        }
        self.discount_type
            .validate(self.discount_value)
            .map_err(|e| FormError::new("discountValue", e.to_string()))?;
        if self.end_date < self.start_date {
            return Err(FormError::new("endDate", "cannot be before the start date"));
        }
        if self.minimum_purchase < Decimal::ZERO {
            return Err(FormError::new("minimumPurchase", "cannot be negative"));
        }
        if self.product_id.as_str().trim().is_empty() {
            return Err(FormError::new("productId", "is required"));
        }
        if self.images.len() > MAX_PROMOTION_IMAGES {
            return Err(FormError::new(
                "images",
                format!("at most {MAX_PROMOTION_IMAGES} images are allowed"),
            ));
        }
        Ok(self)
    }
}

/// Promotion editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionForm {
    name: String,
    description: String,
    discount_type: DiscountType,
    discount_value: String,
    start_date: String,
    end_date: String,
    minimum_purchase: String,
    active: bool,
    product_id: Option<ProductId>,
    images: Vec<String>,
}

impl PromotionForm {
    /// Empty form with both dates set to `today`.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        let today = today.format("%Y-%m-%d").to_string();
        Self {
            name: String::new(),
            description: String::new(),
            discount_type: DiscountType::Percentage,
            discount_value: String::new(),
            start_date: today.clone(),
            end_date: today,
            minimum_purchase: String::new(),
            active: true,
            product_id: None,
            images: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_discount(self, kind: DiscountType, value: impl Into<String>) -> Self {
        Self {
            discount_type: kind,
            discount_value: value.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_dates(self, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: start.into(),
            end_date: end.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_minimum_purchase(self, amount: impl Into<String>) -> Self {
        Self {
            minimum_purchase: amount.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_active(self, active: bool) -> Self {
        Self { active, ..self }
    }

    #[must_use]
    pub fn with_product(self, product_id: &str) -> Self {
        Self {
            product_id: non_empty(product_id),
            ..self
        }
    }

    #[must_use]
    pub fn with_images(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.images.extend(urls);
        self
    }

    /// Convert to a validated payload.
    ///
    /// An empty minimum purchase means no minimum.
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn submit(&self) -> Result<NewPromotion, FormError> {
        let product_id = self
            .product_id
            .clone()
            .ok_or_else(|| FormError::new("productId", "is required"))?;
        let discount_value = parse_decimal("discountValue", &self.discount_value)?;
        let minimum_purchase = if self.minimum_purchase.trim().is_empty() {
            Decimal::ZERO
        } else {
            parse_decimal("minimumPurchase", &self.minimum_purchase)?
        };

        NewPromotion {
            name: self.name.clone(),
            description: self.description.trim().to_owned(),
            discount_type: self.discount_type,
            discount_value,
            start_date: parse_date("startDate", &self.start_date)?,
            end_date: parse_date("endDate", &self.end_date)?,
            minimum_purchase,
            active: self.active,
            product_id,
            images: self.images.clone(),
        }
        .validate()
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Typed category creation payload.
///
/// With no parent this creates a top-level category; with `parentCategory`
/// a subcategory; with both parents a sub-subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_category: Option<CategoryId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_subcategory: Option<NodeId>,
}

impl NewCategory {
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(mut self) -> Result<Self, FormError> {
        self.name = clean_name(&self.name).map_err(|e| FormError::new("name", e.to_string()))?;
        if self.parent_category.is_none() && self.parent_subcategory.is_some() {
            return Err(FormError::new("parentSubcategory", "requires a parent category"));
        }
        Ok(self)
    }
}

/// Category editor state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    name: String,
    parent_category: Option<CategoryId>,
    parent_subcategory: Option<NodeId>,
}

impl CategoryForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Choose the parent category. Clears the parent subcategory.
    #[must_use]
    pub fn with_parent_category(self, category: &str) -> Self {
        Self {
            parent_category: non_empty(category),
            parent_subcategory: None,
            ..self
        }
    }

    #[must_use]
    pub fn with_parent_subcategory(self, subcategory: &str) -> Self {
        Self {
            parent_subcategory: non_empty(subcategory),
            ..self
        }
    }

    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn submit(&self) -> Result<NewCategory, FormError> {
        NewCategory {
            name: self.name.clone(),
            parent_category: self.parent_category.clone(),
            parent_subcategory: self.parent_subcategory.clone(),
        }
        .validate()
    }
}
