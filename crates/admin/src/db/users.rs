//! User document repository.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use cnb_core::{Role, UserUid};

use super::{DocumentRow, RepositoryError, decode_rows, encode};
use crate::models::User;

/// A user document before and after a write.
#[derive(Debug, Clone)]
pub struct UserChange {
    /// Fresh per write.
    pub event_id: Uuid,
    pub before: User,
    pub after: User,
}

/// Repository for the `users` collection.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by auth uid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, uid: &UserUid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, data FROM cnb.users WHERE id = $1")
            .bind(uid.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(DocumentRow::into_doc).transpose()
    }

    /// All users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM cnb.users ORDER BY created_at, id",
        )
        .fetch_all(self.pool)
        .await?;

        decode_rows(rows)
    }

    /// Insert a new user document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the uid already exists.
    pub async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO cnb.users (id, data) VALUES ($1, $2)")
            .bind(user.uid.as_str())
            .bind(encode(user)?)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "user"))?;
        Ok(())
    }

    /// Set a user's role, returning the document before and after.
    ///
    /// The read and write happen under a row lock so concurrent role changes
    /// each see the other's result as their `before`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_role(&self, uid: &UserUid, role: Role) -> Result<UserChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM cnb.users WHERE id = $1 FOR UPDATE",
        )
        .bind(uid.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let before: User = row.into_doc()?;
        let mut after = before.clone();
        after.role = role;
        after.updated_at = Some(Utc::now());

        sqlx::query("UPDATE cnb.users SET data = $2, updated_at = now() WHERE id = $1")
            .bind(uid.as_str())
            .bind(encode(&after)?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(uid = %uid, from = %before.role, to = %after.role, "User role updated");
        Ok(UserChange {
            event_id: Uuid::new_v4(),
            before,
            after,
        })
    }

    /// Delete a user document. Returns `false` if it was already gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, uid: &UserUid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cnb.users WHERE id = $1")
            .bind(uid.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
