//! Promotion document repository.

use sqlx::PgPool;

use cnb_core::PromotionId;

use super::{DocumentRow, RepositoryError, decode_rows, encode};
use crate::models::Promotion;

/// Repository for the `promotions` collection.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All promotions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Promotion>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM cnb.promotions ORDER BY created_at DESC, id",
        )
        .fetch_all(self.pool)
        .await?;
        decode_rows(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let row =
            sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM cnb.promotions WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(self.pool)
                .await?;
        row.map(DocumentRow::into_doc).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn insert(&self, promotion: &Promotion) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cnb.promotions (id, data, created_at, updated_at) VALUES ($1, $2, $3, $3)",
        )
        .bind(promotion.id.as_str())
        .bind(encode(promotion)?)
        .bind(promotion.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "promotion"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the promotion does not exist.
    pub async fn update(&self, promotion: &Promotion) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE cnb.promotions SET data = $2, updated_at = $3 WHERE id = $1")
                .bind(promotion.id.as_str())
                .bind(encode(promotion)?)
                .bind(promotion.updated_at)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Returns `false` if the promotion was already gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &PromotionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cnb.promotions WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
