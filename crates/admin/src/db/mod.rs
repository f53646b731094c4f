//! Document persistence in `PostgreSQL`.
//!
//! # Schema: `cnb`
//!
//! Each collection is a table of JSON documents:
//!
//! - `users` - account documents keyed by auth `uid`
//! - `products` - catalog products
//! - `categories` - top-level categories holding their nested subtree
//! - `promotions` - discount promotions
//! - `notification_ledger` - markers for activation emails already sent
//! - `session` - tower-sessions store
//!
//! Document tables share the shape `(id TEXT PRIMARY KEY, data JSONB,
//! created_at, updated_at)`. Whole documents are written on every update.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p cnb-cli -- migrate
//! ```

pub mod categories;
pub mod notification_ledger;
pub mod products;
pub mod promotions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use thiserror::Error;

pub use categories::CategoryRepository;
pub use notification_ledger::PgNotificationLedger;
pub use products::ProductRepository;
pub use promotions::PromotionRepository;
pub use users::{UserChange, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document does not match its model.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g. duplicate id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique-key violations to `Conflict`.
    fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{what} already exists"))
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Decode a stored JSONB document.
fn decode<T: DeserializeOwned>(id: &str, data: Json<serde_json::Value>) -> Result<T, RepositoryError> {
    serde_json::from_value(data.0)
        .map_err(|e| RepositoryError::DataCorruption(format!("document {id}: {e}")))
}

/// Encode a model for a JSONB column.
fn encode<T: Serialize>(doc: &T) -> Result<Json<serde_json::Value>, RepositoryError> {
    serde_json::to_value(doc)
        .map(Json)
        .map_err(|e| RepositoryError::DataCorruption(format!("unserializable document: {e}")))
}

/// Row shape shared by the document tables.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<serde_json::Value>,
}

impl DocumentRow {
    fn into_doc<T: DeserializeOwned>(self) -> Result<T, RepositoryError> {
        decode(&self.id, self.data)
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<DocumentRow>) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter().map(DocumentRow::into_doc).collect()
}
