//! Integration tests for category tree ordering.
//!
//! These tests build a full three-level tree and run long sequences of
//! inserts, moves and deletes against it, checking the ordering invariants
//! after every step.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeSet;

use chrono::Utc;
use cnb_admin::models::Category;
use cnb_core::category::{
    self, CategoryNode, CategoryTreeError, MoveDirection, Sibling, insert_node, locate, move_node,
    move_sibling, push_sibling, remove_node, remove_sibling,
};
use cnb_core::{Level, NodeId};

// =============================================================================
// Helpers
// =============================================================================

fn orders<T: Sibling>(siblings: &[T]) -> Vec<u32> {
    let mut orders: Vec<u32> = siblings.iter().map(Sibling::order).collect();
    orders.sort_unstable();
    orders
}

fn ids<T: Sibling>(siblings: &[T]) -> BTreeSet<String> {
    siblings.iter().map(|s| s.sibling_id().to_owned()).collect()
}

/// Ids in display order.
fn sequence<T: Sibling>(siblings: &[T]) -> Vec<String> {
    let mut refs: Vec<&T> = siblings.iter().collect();
    refs.sort_by_key(|s| s.order());
    refs.iter().map(|s| s.sibling_id().to_owned()).collect()
}

fn assert_dense<T: Sibling>(siblings: &[T]) {
    let expected: Vec<u32> = (0_u32..).take(siblings.len()).collect();
    assert_eq!(orders(siblings), expected);
}

fn assert_tree_dense(subcategories: &[CategoryNode]) {
    assert_dense(subcategories);
    for sub in subcategories {
        assert_dense(&sub.children);
        for leaf in &sub.children {
            assert!(leaf.children.is_empty(), "sub-subcategories have no children");
        }
    }
}

/// Three subcategories with three sub-subcategories each.
fn tree() -> (Vec<CategoryNode>, Vec<NodeId>) {
    let mut subs = Vec::new();
    let mut parents = Vec::new();
    for i in 0..3 {
        let parent = insert_node(&mut subs, None, &format!("Sub {i}")).unwrap();
        for j in 0..3 {
            insert_node(&mut subs, Some(&parent), &format!("Leaf {i}.{j}")).unwrap();
        }
        parents.push(parent);
    }
    (subs, parents)
}

/// Deterministic pseudo-random walk; no RNG needed for repeatable runs.
fn walk(len: usize, seed: usize) -> impl Iterator<Item = (usize, MoveDirection)> {
    (0..len).map(move |step| {
        let x = step.wrapping_mul(2_654_435_761).wrapping_add(seed) >> 3;
        let direction = if x % 2 == 0 {
            MoveDirection::Up
        } else {
            MoveDirection::Down
        };
        (x / 2, direction)
    })
}

// =============================================================================
// Top-level categories
// =============================================================================

#[test]
fn test_top_level_moves_keep_id_set_and_density() {
    let now = Utc::now();
    let mut categories: Vec<Category> = ["Rugs", "Runners", "Mats", "Tiles", "Outdoor"]
        .into_iter()
        .zip(0..)
        .map(|(name, order)| Category::new(name.to_string(), order, now))
        .collect();
    let before = ids(&categories);

    for (pick, direction) in walk(200, 7) {
        let id = categories[pick % categories.len()].id.to_string();
        move_sibling(&mut categories, &id, direction).unwrap();
        assert_eq!(ids(&categories), before);
        assert_dense(&categories);
    }
}

#[test]
fn test_top_level_move_swaps_with_neighbour() {
    let now = Utc::now();
    let mut categories: Vec<Category> = (0..4)
        .map(|i| Category::new(format!("C{i}"), i, now))
        .collect();
    let initial = sequence(&categories);

    let changed = move_sibling(&mut categories, &initial[1], MoveDirection::Up).unwrap();

    assert_eq!(changed.len(), 2);
    let expected = vec![
        initial[1].clone(),
        initial[0].clone(),
        initial[2].clone(),
        initial[3].clone(),
    ];
    assert_eq!(sequence(&categories), expected);
}

#[test]
fn test_top_level_append_and_delete() {
    let now = Utc::now();
    let mut categories: Vec<Category> = Vec::new();
    for i in 0..4 {
        push_sibling(&mut categories, Category::new(format!("C{i}"), 0, now));
        assert_dense(&categories);
    }

    let second = sequence(&categories)[1].clone();
    let (removed, changed) = remove_sibling(&mut categories, &second).unwrap();

    assert_eq!(removed.id.as_str(), second);
    assert_eq!(changed.len(), 2, "the two categories below move up");
    assert_dense(&categories);
}

// =============================================================================
// Nested levels
// =============================================================================

#[test]
fn test_nested_moves_never_cross_parents() {
    let (mut subs, parents) = tree();
    let membership: Vec<BTreeSet<String>> = subs.iter().map(|s| ids(&s.children)).collect();

    for (pick, direction) in walk(300, 11) {
        let sub = &subs[pick % subs.len()];
        let target = if pick % 3 == 0 {
            sub.id.to_string()
        } else {
            sub.children[pick % sub.children.len()].id.to_string()
        };
        move_node(&mut subs, &target, direction).unwrap();
        assert_tree_dense(&subs);
    }

    for (parent, expected) in parents.iter().zip(&membership) {
        let sub = subs.iter().find(|s| &s.id == parent).unwrap();
        assert_eq!(&ids(&sub.children), expected);
    }
}

#[test]
fn test_insert_rejects_fourth_level() {
    let (mut subs, parents) = tree();
    let leaf = subs
        .iter()
        .find(|s| s.id == parents[0])
        .unwrap()
        .children[0]
        .id
        .clone();

    let err = insert_node(&mut subs, Some(&leaf), "Too deep").unwrap_err();
    assert_eq!(err, CategoryTreeError::DepthExceeded);
}

#[test]
fn test_deleting_nodes_keeps_tree_dense() {
    let (mut subs, parents) = tree();

    let leaf = subs
        .iter()
        .find(|s| s.id == parents[2])
        .unwrap()
        .children[1]
        .id
        .to_string();
    let (_, level) = remove_node(&mut subs, &leaf).unwrap();
    assert_eq!(level, Level::SubSubcategory);
    assert!(locate(&subs, &leaf).is_none());
    assert_tree_dense(&subs);

    let (removed, level) = remove_node(&mut subs, parents[0].as_str()).unwrap();
    assert_eq!(level, Level::Subcategory);
    assert_eq!(removed.children.len(), 3, "children go with their parent");
    assert_eq!(subs.len(), 2);
    assert_tree_dense(&subs);
}

#[test]
fn test_cleared_fields_follow_level() {
    assert_eq!(
        category::cleared_product_fields(Level::Category),
        ["category", "subcategory", "subsubcategory"]
    );
    assert_eq!(
        category::cleared_product_fields(Level::Subcategory),
        ["subcategory", "subsubcategory"]
    );
    assert_eq!(
        category::cleared_product_fields(Level::SubSubcategory),
        ["subsubcategory"]
    );
}

#[test]
fn test_legacy_document_is_normalized_by_position() {
    let json = r#"{
        "id": "cat-1",
        "name": "Rugs",
        "createdAt": "2024-01-01T00:00:00Z",
        "subCategories": [
            {"id": "b", "name": "Wool", "subCategories": [
                {"id": "b2", "name": "Hand-knotted"},
                {"id": "b1", "name": "Tufted"}
            ]},
            {"id": "a", "name": "Silk"}
        ]
    }"#;
    let mut category: Category = serde_json::from_str(json).unwrap();

    assert!(category.normalize());
    assert_eq!(sequence(&category.sub_categories), ["b", "a"]);
    assert_eq!(sequence(&category.sub_categories[0].children), ["b2", "b1"]);
    assert_tree_dense(&category.sub_categories);
    assert!(!category.normalize(), "second pass is a no-op");
}
