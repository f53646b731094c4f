//! Top-level category documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cnb_core::category::{self, Sibling};
use cnb_core::{CategoryId, CategoryNode};

/// A document in the `categories` collection.
///
/// Holds the whole subtree below it in `subCategories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub sub_categories: Vec<CategoryNode>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    #[must_use]
    pub fn new(name: String, order: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: CategoryId::generate(),
            name,
            order,
            sub_categories: Vec::new(),
            created_at: now,
            updated_at: None,
        }
    }

    /// Sort and renumber the nested levels. Returns `true` if anything moved.
    pub fn normalize(&mut self) -> bool {
        category::normalize(&mut self.sub_categories)
    }
}

impl Sibling for Category {
    fn sibling_id(&self) -> &str {
        self.id.as_str()
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use cnb_core::MoveDirection;
    use cnb_core::category::move_sibling;

    use super::*;

    #[test]
    fn test_top_level_move_swaps_two_documents() {
        let now = Utc::now();
        let mut all = vec![
            Category::new("Area Rugs".into(), 0, now),
            Category::new("Broadloom".into(), 1, now),
            Category::new("Runners".into(), 2, now),
        ];
        let runners = all[2].id.clone();

        let changed = move_sibling(&mut all, runners.as_str(), MoveDirection::Up).unwrap();
        assert_eq!(changed.len(), 2);
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Area Rugs", "Runners", "Broadloom"]);
    }

    #[test]
    fn test_subcategories_field_name() {
        let category = Category::new("Area Rugs".into(), 0, Utc::now());
        let json = serde_json::to_value(&category).unwrap();
        assert!(json.get("subCategories").is_some());
        assert!(json.get("updatedAt").is_none());
    }
}
