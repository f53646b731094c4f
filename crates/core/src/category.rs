//! Three-level category tree and its ordering operations.
//!
//! A category document holds an ordered list of subcategories, each holding
//! an ordered list of sub-subcategories. Every level carries an `order`
//! field. After any insert, delete or move the siblings' `order` values form
//! the dense sequence `0..n-1`.
//!
//! Top-level categories are separate documents, so the sibling operations
//! here are generic over [`Sibling`]: the admin crate implements it for the
//! category document and reuses the same move/renumber logic.
//!
//! All functions are pure; persistence decides how to write back the
//! siblings whose ids are returned as changed.

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Depth of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Category,
    Subcategory,
    SubSubcategory,
}

/// Direction of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Errors from tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryTreeError {
    #[error("category name cannot be empty")]
    EmptyName,
    #[error("node {0} not found")]
    NodeNotFound(String),
    #[error("sub-subcategories cannot have children")]
    DepthExceeded,
    #[error("subcategory {sub} does not belong to the selected parent")]
    InvalidSelection { sub: String },
}

/// An element of an ordered sibling list.
pub trait Sibling {
    /// Stable identifier of the element.
    fn sibling_id(&self) -> &str;
    /// Current display position.
    fn order(&self) -> u32;
    /// Overwrite the display position.
    fn set_order(&mut self, order: u32);
}

/// A subcategory or sub-subcategory.
///
/// Sub-subcategories always have an empty `children` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, rename = "subCategories")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Create a leaf node with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            order,
            children: Vec::new(),
        }
    }
}

impl Sibling for CategoryNode {
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

/// Validate and trim a node name.
///
/// # Errors
///
/// Returns [`CategoryTreeError::EmptyName`] for blank names.
pub fn clean_name(name: &str) -> Result<String, CategoryTreeError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CategoryTreeError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

// =============================================================================
// Generic sibling operations
// =============================================================================

/// Sort siblings by `order`. Ties keep their current relative position.
pub fn sort_siblings<T: Sibling>(siblings: &mut [T]) {
    siblings.sort_by_key(|s| s.order());
}

/// Sort, then rewrite `order` to `0..n-1`.
///
/// Returns the ids whose `order` changed.
pub fn renumber<T: Sibling>(siblings: &mut [T]) -> Vec<String> {
    sort_siblings(siblings);
    let mut changed = Vec::new();
    for (position, sibling) in (0_u32..).zip(siblings.iter_mut()) {
        if sibling.order() != position {
            sibling.set_order(position);
            changed.push(sibling.sibling_id().to_owned());
        }
    }
    changed
}

fn is_dense<T: Sibling>(sorted: &[T]) -> bool {
    (0_u32..).zip(sorted).all(|(i, s)| s.order() == i)
}

/// Move a sibling one position up or down.
///
/// The node swaps its `order` with its immediate neighbour in the sorted
/// list. Moving the first node up or the last node down changes nothing.
/// If the list's `order` values are not dense (duplicates or gaps left by an
/// interrupted write), they are renumbered first so the swap is visible.
///
/// Returns the ids whose `order` changed; the slice is left sorted.
///
/// # Errors
///
/// Returns [`CategoryTreeError::NodeNotFound`] if `id` is not a sibling.
pub fn move_sibling<T: Sibling>(
    siblings: &mut [T],
    id: &str,
    direction: MoveDirection,
) -> Result<Vec<String>, CategoryTreeError> {
    sort_siblings(siblings);
    let index = siblings
        .iter()
        .position(|s| s.sibling_id() == id)
        .ok_or_else(|| CategoryTreeError::NodeNotFound(id.to_owned()))?;

    let neighbour = match direction {
        MoveDirection::Up => index.checked_sub(1),
        MoveDirection::Down => Some(index + 1).filter(|&n| n < siblings.len()),
    };
    let Some(neighbour) = neighbour else {
        return Ok(Vec::new());
    };

    let mut changed = if is_dense(siblings) {
        Vec::new()
    } else {
        renumber(siblings)
    };

    let (low, high) = (index.min(neighbour), index.max(neighbour));
    let (head, tail) = siblings.split_at_mut(high);
    let (Some(a), Some(b)) = (head.get_mut(low), tail.first_mut()) else {
        return Ok(changed);
    };
    let (order_a, order_b) = (a.order(), b.order());
    a.set_order(order_b);
    b.set_order(order_a);

    for moved in [a.sibling_id(), b.sibling_id()] {
        if !changed.iter().any(|c| c == moved) {
            changed.push(moved.to_owned());
        }
    }
    sort_siblings(siblings);
    Ok(changed)
}

/// Remove a sibling and renumber the rest.
///
/// Returns the removed element and the ids of the remaining siblings whose
/// `order` changed.
///
/// # Errors
///
/// Returns [`CategoryTreeError::NodeNotFound`] if `id` is not a sibling.
pub fn remove_sibling<T: Sibling>(
    siblings: &mut Vec<T>,
    id: &str,
) -> Result<(T, Vec<String>), CategoryTreeError> {
    let index = siblings
        .iter()
        .position(|s| s.sibling_id() == id)
        .ok_or_else(|| CategoryTreeError::NodeNotFound(id.to_owned()))?;
    let removed = siblings.remove(index);
    let changed = renumber(siblings);
    Ok((removed, changed))
}

/// Append a sibling at the end of the list.
///
/// The list is renumbered first, so the new element gets `order == n`.
/// Returns the ids of existing siblings whose `order` changed.
pub fn push_sibling<T: Sibling>(siblings: &mut Vec<T>, mut item: T) -> Vec<String> {
    let changed = renumber(siblings);
    item.set_order(u32::try_from(siblings.len()).unwrap_or(u32::MAX));
    siblings.push(item);
    changed
}

// =============================================================================
// Nested levels inside one category document
// =============================================================================

/// Where a nested node lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    pub level: Level,
    /// Parent subcategory for sub-subcategories.
    pub parent: Option<NodeId>,
}

/// Find which level `id` is on within a category's subcategory list.
#[must_use]
pub fn locate(subcategories: &[CategoryNode], id: &str) -> Option<NodeLocation> {
    if subcategories.iter().any(|s| s.id.as_str() == id) {
        return Some(NodeLocation {
            level: Level::Subcategory,
            parent: None,
        });
    }
    subcategories
        .iter()
        .find(|s| s.children.iter().any(|c| c.id.as_str() == id))
        .map(|s| NodeLocation {
            level: Level::SubSubcategory,
            parent: Some(s.id.clone()),
        })
}

/// The sibling list containing `id`.
fn siblings_of_mut<'a>(
    subcategories: &'a mut Vec<CategoryNode>,
    id: &str,
) -> Result<&'a mut Vec<CategoryNode>, CategoryTreeError> {
    let location =
        locate(subcategories, id).ok_or_else(|| CategoryTreeError::NodeNotFound(id.to_owned()))?;
    match location.parent {
        None => Ok(subcategories),
        Some(parent) => subcategories
            .iter_mut()
            .find(|s| s.id == parent)
            .map(|s| &mut s.children)
            .ok_or_else(|| CategoryTreeError::NodeNotFound(parent.into_inner())),
    }
}

/// Insert a new node under `parent` (a subcategory) or, with `None`, as a
/// new subcategory.
///
/// Returns the new node's id.
///
/// # Errors
///
/// - [`CategoryTreeError::EmptyName`] for blank names
/// - [`CategoryTreeError::DepthExceeded`] when `parent` is a sub-subcategory
/// - [`CategoryTreeError::NodeNotFound`] when `parent` does not exist
pub fn insert_node(
    subcategories: &mut Vec<CategoryNode>,
    parent: Option<&NodeId>,
    name: &str,
) -> Result<NodeId, CategoryTreeError> {
    let name = clean_name(name)?;
    let node = CategoryNode::new(name, 0);
    let id = node.id.clone();

    let target = match parent {
        None => subcategories,
        Some(parent) => match locate(subcategories, parent.as_str()) {
            Some(NodeLocation {
                level: Level::Subcategory,
                ..
            }) => subcategories
                .iter_mut()
                .find(|s| &s.id == parent)
                .map(|s| &mut s.children)
                .ok_or_else(|| CategoryTreeError::NodeNotFound(parent.to_string()))?,
            Some(_) => return Err(CategoryTreeError::DepthExceeded),
            None => return Err(CategoryTreeError::NodeNotFound(parent.to_string())),
        },
    };

    push_sibling(target, node);
    Ok(id)
}

/// Move a subcategory or sub-subcategory within its own sibling list.
///
/// # Errors
///
/// Returns [`CategoryTreeError::NodeNotFound`] if `id` is not in the tree.
pub fn move_node(
    subcategories: &mut Vec<CategoryNode>,
    id: &str,
    direction: MoveDirection,
) -> Result<Vec<String>, CategoryTreeError> {
    let siblings = siblings_of_mut(subcategories, id)?;
    move_sibling(siblings, id, direction)
}

/// Remove a subcategory (with its children) or a sub-subcategory.
///
/// Returns the removed node and the level it was on.
///
/// # Errors
///
/// Returns [`CategoryTreeError::NodeNotFound`] if `id` is not in the tree.
pub fn remove_node(
    subcategories: &mut Vec<CategoryNode>,
    id: &str,
) -> Result<(CategoryNode, Level), CategoryTreeError> {
    let level = locate(subcategories, id)
        .ok_or_else(|| CategoryTreeError::NodeNotFound(id.to_owned()))?
        .level;
    let siblings = siblings_of_mut(subcategories, id)?;
    let (removed, _) = remove_sibling(siblings, id)?;
    Ok((removed, level))
}

/// Rename a nested node.
///
/// # Errors
///
/// Returns [`CategoryTreeError::EmptyName`] or [`CategoryTreeError::NodeNotFound`].
pub fn rename_node(
    subcategories: &mut Vec<CategoryNode>,
    id: &str,
    name: &str,
) -> Result<(), CategoryTreeError> {
    let name = clean_name(name)?;
    let siblings = siblings_of_mut(subcategories, id)?;
    let node = siblings
        .iter_mut()
        .find(|s| s.id.as_str() == id)
        .ok_or_else(|| CategoryTreeError::NodeNotFound(id.to_owned()))?;
    node.name = name;
    Ok(())
}

/// Sort and renumber both nested levels.
///
/// Documents written before ordering existed deserialize with every
/// `order == 0`; the stable sort keeps their array order, so they come out
/// numbered by position. Returns `true` if anything changed.
pub fn normalize(subcategories: &mut [CategoryNode]) -> bool {
    let mut changed = !renumber(subcategories).is_empty();
    for sub in subcategories.iter_mut() {
        for leaf in &mut sub.children {
            changed |= !leaf.children.is_empty();
            leaf.children.clear();
        }
        changed |= !renumber(&mut sub.children).is_empty();
    }
    changed
}

/// Product fields to null when a node on `level` is deleted.
///
/// Deleting a node orphans every product that points at it or below it.
#[must_use]
pub const fn cleared_product_fields(level: Level) -> &'static [&'static str] {
    match level {
        Level::Category => &["category", "subcategory", "subsubcategory"],
        Level::Subcategory => &["subcategory", "subsubcategory"],
        Level::SubSubcategory => &["subsubcategory"],
    }
}

/// The product field that references a node on `level`.
#[must_use]
pub const fn product_field(level: Level) -> &'static str {
    match level {
        Level::Category => "category",
        Level::Subcategory => "subcategory",
        Level::SubSubcategory => "subsubcategory",
    }
}

/// Check a product's subcategory selection against a category's tree.
///
/// # Errors
///
/// Returns [`CategoryTreeError::InvalidSelection`] when the subcategory is
/// not a child of the category, or the sub-subcategory is not a child of the
/// subcategory (or is given without one).
pub fn validate_selection(
    subcategories: &[CategoryNode],
    subcategory: Option<&str>,
    subsubcategory: Option<&str>,
) -> Result<(), CategoryTreeError> {
    match (subcategory, subsubcategory) {
        (None, None) => Ok(()),
        (None, Some(subsub)) => Err(CategoryTreeError::InvalidSelection {
            sub: subsub.to_owned(),
        }),
        (Some(sub), subsub) => {
            let node = subcategories
                .iter()
                .find(|s| s.id.as_str() == sub)
                .ok_or_else(|| CategoryTreeError::InvalidSelection {
                    sub: sub.to_owned(),
                })?;
            match subsub {
                Some(subsub) if !node.children.iter().any(|c| c.id.as_str() == subsub) => {
                    Err(CategoryTreeError::InvalidSelection {
                        sub: subsub.to_owned(),
                    })
                }
                _ => Ok(()),
            }
        }
    }
}
