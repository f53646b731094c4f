//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::FirebaseConfig;
use crate::services::{
    ChangeFeed, FirebaseAuthClient, IdentityError, StorageClient, StorageError,
};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("storage client: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and service clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    identity: FirebaseAuthClient,
    storage: StorageClient,
    changes: ChangeFeed,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `changes` is the publishing side of the feed the notifier worker
    /// consumes.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(
        firebase: &FirebaseConfig,
        pool: PgPool,
        changes: ChangeFeed,
    ) -> Result<Self, StateError> {
        let identity = FirebaseAuthClient::new(firebase)?;
        let storage = StorageClient::new(firebase)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pool,
                identity,
                storage,
                changes,
            }),
        })
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn identity(&self) -> &FirebaseAuthClient {
        &self.inner.identity
    }

    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Feed for user document changes.
    #[must_use]
    pub fn changes(&self) -> &ChangeFeed {
        &self.inner.changes
    }
}
