//! Activation emails on role changes.
//!
//! Every write to a user document publishes its before/after snapshot onto
//! the [`ChangeFeed`]. A single background worker consumes the feed and runs
//! [`RoleChangeNotifier::deliver`] for each change: when an account leaves
//! `Pending` the user gets one activation email.
//!
//! Delivery is at-least-once. Transient failures are retried with
//! exponential backoff and jitter. Each change carries the id of the write
//! that produced it; a ledger entry keyed on that id, written after a
//! successful send, stops a retried or replayed change from emailing twice
//! while a later activation of the same user still gets its own email.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use cnb_core::{Role, UserUid};

use crate::config::NotifierConfig;
use crate::db::{RepositoryError, UserChange};
use crate::models::User;
use crate::services::email::{EmailError, Mailer, activation_email};

/// Capacity of the in-process change feed.
pub const FEED_CAPACITY: usize = 256;

/// Notification types tracked in the dedupe ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Activation,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
        }
    }
}

/// Record of notifications already delivered, per user write.
pub trait NotificationLedger: Send + Sync {
    fn has_sent(
        &self,
        uid: &UserUid,
        kind: NotificationKind,
        event_id: Uuid,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn record(
        &self,
        uid: &UserUid,
        kind: NotificationKind,
        event_id: Uuid,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A user document before and after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    /// Identifies the write; redeliveries of one change share it.
    pub event_id: Uuid,
    pub before: User,
    pub after: User,
}

impl From<UserChange> for RoleChange {
    fn from(change: UserChange) -> Self {
        Self {
            event_id: change.event_id,
            before: change.before,
            after: change.after,
        }
    }
}

/// Whether a role transition activates the account.
#[must_use]
pub const fn should_notify(before: Role, after: Role) -> bool {
    before.is_pending() && !after.is_pending()
}

/// What the activation email tells the user about their access.
#[must_use]
pub const fn access_message(role: Role) -> &'static str {
    match role {
        Role::UserWithPrice => {
            "You have been granted access to view our full catalog including pricing information."
        }
        Role::UserWithoutPrice => {
            "You have been granted access to view our catalog. To see pricing information, please contact our sales team."
        }
        Role::Manager => {
            "You have been granted manager access with additional privileges to manage orders and view analytics."
        }
        Role::Admin => "You have been granted full administrative access.",
        Role::Pending => "You have been granted access to our platform.",
    }
}

/// Errors from a single delivery attempt.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("user {0} has no email address")]
    MissingRecipient(UserUid),

    #[error("user {uid} has an invalid email address: {reason}")]
    InvalidRecipient { uid: UserUid, reason: String },

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] RepositoryError),
}

impl NotifierError {
    /// Whether retrying the same change cannot succeed.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::MissingRecipient(_) | Self::InvalidRecipient { .. } => true,
            Self::Email(e) => e.is_permanent(),
            Self::Ledger(_) => false,
        }
    }
}

/// Result of handling one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The transition does not activate the account.
    NotTriggered,
    /// The activation email went out on an earlier delivery of this change.
    AlreadySent,
    Sent,
}

/// Delay before retry number `attempt` (1-based): `initial * 2^(attempt-1)`
/// plus up to half of `initial` of random jitter.
#[must_use]
pub fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = initial.saturating_mul(1_u32 << exponent);

    let jitter_ceiling = u64::try_from(initial.as_millis() / 2).unwrap_or(u64::MAX);
    let jitter = if jitter_ceiling == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ceiling)
    };
    base.saturating_add(Duration::from_millis(jitter))
}

/// Sends activation emails for role changes.
pub struct RoleChangeNotifier<M, L> {
    mailer: M,
    ledger: L,
    login_url: String,
    policy: NotifierConfig,
}

impl<M: Mailer, L: NotificationLedger> RoleChangeNotifier<M, L> {
    pub fn new(mailer: M, ledger: L, login_url: impl Into<String>, policy: NotifierConfig) -> Self {
        Self {
            mailer,
            ledger,
            login_url: login_url.into(),
            policy,
        }
    }

    /// Handle one change with a single send attempt.
    ///
    /// # Errors
    ///
    /// Returns error if the user has no usable address, rendering or sending
    /// fails, or the ledger cannot be read or written.
    pub async fn handle(&self, change: &RoleChange) -> Result<Outcome, NotifierError> {
        let RoleChange {
            event_id,
            before,
            after,
        } = change;

        if !should_notify(before.role, after.role) {
            tracing::debug!(
                uid = %after.uid,
                before = %before.role,
                after = %after.role,
                "No relevant role change"
            );
            return Ok(Outcome::NotTriggered);
        }

        tracing::info!(uid = %after.uid, from = %before.role, to = %after.role, "Account activated");

        if self
            .ledger
            .has_sent(&after.uid, NotificationKind::Activation, *event_id)
            .await?
        {
            tracing::info!(
                uid = %after.uid,
                event = %event_id,
                "Activation email already sent, skipping"
            );
            return Ok(Outcome::AlreadySent);
        }

        if after.email.trim().is_empty() {
            return Err(NotifierError::MissingRecipient(after.uid.clone()));
        }
        let to = after.recipient().map_err(|e| NotifierError::InvalidRecipient {
            uid: after.uid.clone(),
            reason: e.to_string(),
        })?;

        let email = activation_email(
            to,
            after.display_name(),
            after.role,
            access_message(after.role),
            &self.login_url,
        )?;
        self.mailer.send(&email).await?;
        self.ledger
            .record(&after.uid, NotificationKind::Activation, *event_id)
            .await?;

        Ok(Outcome::Sent)
    }

    /// Handle one change, retrying transient failures with backoff.
    ///
    /// # Errors
    ///
    /// Returns the last error once it is permanent or attempts run out.
    pub async fn deliver(&self, change: &RoleChange) -> Result<Outcome, NotifierError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.handle(change).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_permanent() || attempt >= max_attempts => {
                    tracing::error!(
                        uid = %change.after.uid,
                        attempt,
                        error = %e,
                        "Activation email failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff_delay(self.policy.initial_backoff, attempt);
                    tracing::warn!(
                        uid = %change.after.uid,
                        attempt,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Activation email attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Consume the feed until every sender is dropped.
    pub async fn run(self, mut feed: mpsc::Receiver<RoleChange>) {
        tracing::info!("Role change notifier started");
        while let Some(change) = feed.recv().await {
            if let Err(e) = self.deliver(&change).await {
                sentry::capture_error(&e);
            }
        }
        tracing::info!("Role change notifier stopped");
    }
}

impl<M, L> RoleChangeNotifier<M, L>
where
    M: Mailer + 'static,
    L: NotificationLedger + 'static,
{
    /// Run the notifier as a background task.
    pub fn spawn(self, feed: mpsc::Receiver<RoleChange>) -> JoinHandle<()> {
        tokio::spawn(self.run(feed))
    }
}

/// Publishing side of the user change feed.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: mpsc::Sender<RoleChange>,
}

impl ChangeFeed {
    /// Create a feed and the receiver the notifier consumes.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RoleChange>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Publish a user document change.
    ///
    /// A stopped notifier is logged, not returned: the write it reports has
    /// already been committed.
    pub async fn publish(&self, change: impl Into<RoleChange>) {
        let change = change.into();
        let uid = change.after.uid.clone();
        if self.tx.send(change).await.is_err() {
            tracing::error!(uid = %uid, "Change feed closed, role change not published");
        }
    }
}
