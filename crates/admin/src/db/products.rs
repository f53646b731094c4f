//! Product document repository.

use sqlx::{PgConnection, PgPool};

use cnb_core::category::{Level, cleared_product_fields, product_field};
use cnb_core::ProductId;

use super::{DocumentRow, RepositoryError, decode_rows, encode};
use crate::models::Product;

/// Repository for the `products` collection.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM cnb.products ORDER BY created_at DESC, id",
        )
        .fetch_all(self.pool)
        .await?;
        decode_rows(rows)
    }

    /// The most recently created products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM cnb.products ORDER BY created_at DESC, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        decode_rows(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cnb.products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row =
            sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM cnb.products WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(self.pool)
                .await?;
        row.map(DocumentRow::into_doc).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM cnb.products WHERE id = $1)",
        )
        .bind(id.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cnb.products (id, data, created_at, updated_at) VALUES ($1, $2, $3, $3)",
        )
        .bind(product.id.as_str())
        .bind(encode(product)?)
        .bind(product.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "product"))?;
        Ok(())
    }

    /// Replace a product document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE cnb.products SET data = $2, updated_at = $3 WHERE id = $1")
                .bind(product.id.as_str())
                .bind(encode(product)?)
                .bind(product.updated_at)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product document. Returns `false` if it was already gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cnb.products WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// SQL nulling every product reference to a deleted node and below it.
fn clear_references_sql(level: Level) -> String {
    let nulls = cleared_product_fields(level)
        .iter()
        .map(|field| format!("'{field}', NULL"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE cnb.products \
         SET data = data || jsonb_build_object({nulls}), updated_at = now() \
         WHERE data->>'{}' = $1",
        product_field(level)
    )
}

/// Null the category references of every product pointing at `node_id`.
///
/// Runs on the caller's connection so it can share the transaction that
/// deletes the node. Returns the number of products updated.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub(crate) async fn clear_references(
    conn: &mut PgConnection,
    level: Level,
    node_id: &str,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(&clear_references_sql(level))
        .bind(node_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
