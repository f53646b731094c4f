//! Category repository.
//!
//! Top-level categories are separate documents ordered by their `order`
//! field; everything below them lives inside the owning document. Every
//! mutation runs in one transaction with the affected rows locked, so the
//! sibling `order` values stay dense even when two admins reorder at once.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use cnb_core::category::{self, Level, Sibling};
use cnb_core::{CategoryId, MoveDirection, NodeId};

use super::products::clear_references;
use super::{DocumentRow, RepositoryError, decode_rows, encode};
use crate::models::Category;

/// Repository for the `categories` collection.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in display order, nested levels sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM cnb.categories ORDER BY created_at, id",
        )
        .fetch_all(self.pool)
        .await?;

        let mut categories: Vec<Category> = decode_rows(rows)?;
        category::sort_siblings(&mut categories);
        for c in &mut categories {
            c.normalize();
        }
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row =
            sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM cnb.categories WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(self.pool)
                .await?;

        let mut found: Option<Category> = row.map(DocumentRow::into_doc).transpose()?;
        if let Some(c) = found.as_mut() {
            c.normalize();
        }
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cnb.categories")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Append a new top-level category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(&self, name: String) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut all = load_all_for_update(&mut tx).await?;
        let now = Utc::now();
        let changed = category::push_sibling(&mut all, Category::new(name, 0, now));
        save_changed(&mut tx, &all, &changed).await?;

        let created = all.last().cloned().ok_or(RepositoryError::NotFound)?;
        sqlx::query(
            "INSERT INTO cnb.categories (id, data, created_at, updated_at) VALUES ($1, $2, $3, $3)",
        )
        .bind(created.id.as_str())
        .bind(encode(&created)?)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "category"))?;

        tx.commit().await?;
        tracing::info!(category_id = %created.id, order = created.order, "Category created");
        Ok(created)
    }

    /// Add a subcategory (`parent == None`) or sub-subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist;
    /// tree errors are returned as `Ok(Err(_))`.
    pub async fn add_node(
        &self,
        category_id: &CategoryId,
        parent: Option<&NodeId>,
        name: &str,
    ) -> Result<Result<NodeId, category::CategoryTreeError>, RepositoryError> {
        self.edit_tree(category_id, |c| {
            category::insert_node(&mut c.sub_categories, parent, name)
        })
        .await
    }

    /// Rename a top-level category or one of its nested nodes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn rename(
        &self,
        category_id: &CategoryId,
        node: Option<&NodeId>,
        name: &str,
    ) -> Result<Result<(), category::CategoryTreeError>, RepositoryError> {
        self.edit_tree(category_id, |c| match node {
            None => category::clean_name(name).map(|n| c.name = n),
            Some(node) => category::rename_node(&mut c.sub_categories, node.as_str(), name),
        })
        .await
    }

    /// Move a nested node within its sibling list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn move_node(
        &self,
        category_id: &CategoryId,
        node: &NodeId,
        direction: MoveDirection,
    ) -> Result<Result<Vec<String>, category::CategoryTreeError>, RepositoryError> {
        self.edit_tree(category_id, |c| {
            category::move_node(&mut c.sub_categories, node.as_str(), direction)
        })
        .await
    }

    /// Move a top-level category, swapping `order` with its neighbour.
    ///
    /// Returns the ids of the documents rewritten (empty at either edge).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn move_category(
        &self,
        id: &CategoryId,
        direction: MoveDirection,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut all = load_all_for_update(&mut tx).await?;
        let changed = category::move_sibling(&mut all, id.as_str(), direction)
            .map_err(|_| RepositoryError::NotFound)?;
        save_changed(&mut tx, &all, &changed).await?;

        tx.commit().await?;
        tracing::info!(category_id = %id, ?direction, rewritten = changed.len(), "Category moved");
        Ok(changed)
    }

    /// Delete a top-level category.
    ///
    /// In one transaction: null every product reference to it, delete the
    /// document, renumber the remaining categories. Returns the number of
    /// products whose references were cleared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete_category(&self, id: &CategoryId) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut all = load_all_for_update(&mut tx).await?;
        let (_, changed) =
            category::remove_sibling(&mut all, id.as_str()).map_err(|_| RepositoryError::NotFound)?;

        let cleared = clear_references(&mut tx, Level::Category, id.as_str()).await?;
        sqlx::query("DELETE FROM cnb.categories WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        save_changed(&mut tx, &all, &changed).await?;

        tx.commit().await?;
        tracing::info!(category_id = %id, products_cleared = cleared, "Category deleted");
        Ok(cleared)
    }

    /// Delete a subcategory or sub-subcategory and clear product references
    /// to it in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category or node does not exist.
    pub async fn delete_node(
        &self,
        category_id: &CategoryId,
        node: &NodeId,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut doc = load_one_for_update(&mut tx, category_id).await?;
        let (removed, level) = category::remove_node(&mut doc.sub_categories, node.as_str())
            .map_err(|_| RepositoryError::NotFound)?;
        doc.updated_at = Some(Utc::now());
        save(&mut tx, &doc).await?;

        let cleared = clear_references(&mut tx, level, removed.id.as_str()).await?;

        tx.commit().await?;
        tracing::info!(
            category_id = %category_id,
            node_id = %node,
            ?level,
            products_cleared = cleared,
            "Category node deleted"
        );
        Ok(cleared)
    }

    /// Load one document under lock, apply `edit`, and write it back if the
    /// edit succeeded.
    async fn edit_tree<T, F>(
        &self,
        category_id: &CategoryId,
        edit: F,
    ) -> Result<Result<T, category::CategoryTreeError>, RepositoryError>
    where
        F: FnOnce(&mut Category) -> Result<T, category::CategoryTreeError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut doc = load_one_for_update(&mut tx, category_id).await?;
        let outcome = edit(&mut doc);
        if outcome.is_ok() {
            doc.updated_at = Some(Utc::now());
            save(&mut tx, &doc).await?;
            tx.commit().await?;
        }
        Ok(outcome)
    }
}

async fn load_all_for_update(conn: &mut PgConnection) -> Result<Vec<Category>, RepositoryError> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, data FROM cnb.categories ORDER BY created_at, id FOR UPDATE",
    )
    .fetch_all(conn)
    .await?;
    let mut all: Vec<Category> = decode_rows(rows)?;
    category::sort_siblings(&mut all);
    Ok(all)
}

async fn load_one_for_update(
    conn: &mut PgConnection,
    id: &CategoryId,
) -> Result<Category, RepositoryError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, data FROM cnb.categories WHERE id = $1 FOR UPDATE",
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    let mut doc: Category = row.into_doc()?;
    doc.normalize();
    Ok(doc)
}

async fn save(conn: &mut PgConnection, doc: &Category) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE cnb.categories SET data = $2, updated_at = now() WHERE id = $1")
        .bind(doc.id.as_str())
        .bind(encode(doc)?)
        .execute(conn)
        .await?;
    Ok(())
}

/// Write back the top-level documents whose ids are in `changed`.
async fn save_changed(
    conn: &mut PgConnection,
    all: &[Category],
    changed: &[String],
) -> Result<(), RepositoryError> {
    for doc in all.iter().filter(|c| changed.iter().any(|id| id == c.sibling_id())) {
        save(&mut *conn, doc).await?;
    }
    Ok(())
}
