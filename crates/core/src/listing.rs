//! Search and sort for the list pages.
//!
//! List endpoints accept `?q=&sort=&dir=`. Search is a case-insensitive
//! substring match over a few text fields; sorting is stable so records with
//! equal keys keep their stored order.

use std::cmp::Ordering;

use serde::Deserialize;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Apply the direction to an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Product list sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    #[default]
    Name,
    Price,
    Stock,
}

/// User list sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserSort {
    #[default]
    Name,
    Email,
    Role,
}

/// Query string of a list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, bound(deserialize = "S: Deserialize<'de> + Default"))]
pub struct ListQuery<S> {
    pub q: Option<String>,
    pub sort: S,
    pub dir: SortDirection,
}

impl<S> ListQuery<S> {
    /// The trimmed search term, if any.
    #[must_use]
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Whether any of `fields` contains `term`, ignoring case.
///
/// An empty term matches everything.
#[must_use]
pub fn matches_term(term: &str, fields: &[&str]) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&term))
}

/// Case-insensitive text comparison used for name and email columns.
#[must_use]
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filter by `term` and stable-sort the remainder.
pub fn search_and_sort<T, F, C>(items: Vec<T>, term: Option<&str>, fields: F, mut cmp: C) -> Vec<T>
where
    F: Fn(&T) -> Vec<&str>,
    C: FnMut(&T, &T) -> Ordering,
{
    let mut items: Vec<T> = match term {
        Some(term) => items
            .into_iter()
            .filter(|item| matches_term(term, &fields(item)))
            .collect(),
        None => items,
    };
    items.sort_by(|a, b| cmp(a, b));
    items
}
