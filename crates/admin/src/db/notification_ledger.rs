//! Dedupe ledger for outgoing notifications.
//!
//! One row per `(uid, kind, event_id)` records that a notification was
//! delivered for a given user write, so a retried or replayed role change
//! does not email the user twice.

use sqlx::PgPool;
use uuid::Uuid;

use cnb_core::UserUid;

use super::RepositoryError;
use crate::services::notifier::{NotificationKind, NotificationLedger};

/// Ledger stored in `cnb.notification_ledger`.
#[derive(Debug, Clone)]
pub struct PgNotificationLedger {
    pool: PgPool,
}

impl PgNotificationLedger {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl NotificationLedger for PgNotificationLedger {
    async fn has_sent(
        &self,
        uid: &UserUid,
        kind: NotificationKind,
        event_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let sent = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM cnb.notification_ledger \
             WHERE uid = $1 AND kind = $2 AND event_id = $3)",
        )
        .bind(uid.as_str())
        .bind(kind.as_str())
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sent)
    }

    async fn record(
        &self,
        uid: &UserUid,
        kind: NotificationKind,
        event_id: Uuid,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cnb.notification_ledger (uid, kind, event_id) VALUES ($1, $2, $3) \
             ON CONFLICT (uid, kind, event_id) DO NOTHING",
        )
        .bind(uid.as_str())
        .bind(kind.as_str())
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
