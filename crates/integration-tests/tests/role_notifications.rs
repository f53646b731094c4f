//! Integration tests for activation emails on role changes.
//!
//! Changes are published onto a real change feed and consumed by the
//! spawned notifier worker; only the mail relay and the dedupe ledger are
//! replaced with in-memory versions.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cnb_admin::config::NotifierConfig;
use cnb_admin::db::RepositoryError;
use cnb_admin::models::User;
use cnb_admin::services::email::ACTIVATION_SUBJECT;
use cnb_admin::services::notifier::Outcome;
use cnb_admin::services::{
    ChangeFeed, EmailError, Mailer, NotificationKind, NotificationLedger, OutgoingEmail,
    RoleChange, RoleChangeNotifier,
};
use cnb_core::{Role, UserUid};
use uuid::Uuid;

// =============================================================================
// Fakes
// =============================================================================

/// Mailer that records every delivered message.
#[derive(Clone, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    /// Recipient the relay refuses outright.
    rejected: Option<String>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        if self.rejected.as_deref() == Some(email.to.as_str()) {
            return Err(EmailError::InvalidAddress(email.to.to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Ledger shared between notifier instances, as the database table is.
#[derive(Clone, Default)]
struct SharedLedger {
    entries: Arc<Mutex<HashSet<(UserUid, &'static str, Uuid)>>>,
}

impl NotificationLedger for SharedLedger {
    async fn has_sent(
        &self,
        uid: &UserUid,
        kind: NotificationKind,
        event_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .contains(&(uid.clone(), kind.as_str(), event_id)))
    }

    async fn record(
        &self,
        uid: &UserUid,
        kind: NotificationKind,
        event_id: Uuid,
    ) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .unwrap()
            .insert((uid.clone(), kind.as_str(), event_id));
        Ok(())
    }
}

const LOGIN_URL: &str = "https://cnb-web.vercel.app/login";

fn policy() -> NotifierConfig {
    NotifierConfig {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
    }
}

fn notifier(mailer: RecordingMailer, ledger: SharedLedger) -> RoleChangeNotifier<RecordingMailer, SharedLedger> {
    RoleChangeNotifier::new(mailer, ledger, LOGIN_URL, policy())
}

fn user(uid: &str, email: &str, name: &str) -> User {
    User::pending(UserUid::new(uid), email, name)
}

fn change(user: &User, before: Role, after: Role) -> RoleChange {
    let mut old = user.clone();
    old.role = before;
    let mut new = user.clone();
    new.role = after;
    RoleChange {
        event_id: Uuid::new_v4(),
        before: old,
        after: new,
    }
}

/// Publish `changes`, close the feed and wait for the worker to drain it.
async fn run_feed(mailer: RecordingMailer, ledger: SharedLedger, changes: Vec<RoleChange>) {
    let (feed, rx) = ChangeFeed::channel(16);
    let worker = notifier(mailer, ledger).spawn(rx);

    for change in changes {
        feed.publish(change).await;
    }
    drop(feed);

    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
}

// =============================================================================
// Feed + worker
// =============================================================================

#[tokio::test]
async fn test_each_activation_sends_exactly_one_email() {
    let mailer = RecordingMailer::default();
    let jane = user("u1", "jane@example.com", "Jane");
    let omar = user("u2", "omar@example.com", "Omar");

    run_feed(
        mailer.clone(),
        SharedLedger::default(),
        vec![
            change(&jane, Role::Pending, Role::UserWithPrice),
            change(&omar, Role::Pending, Role::Manager),
        ],
    )
    .await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to.as_str(), "jane@example.com");
    assert_eq!(sent[1].to.as_str(), "omar@example.com");
    for email in &sent {
        assert_eq!(email.subject, ACTIVATION_SUBJECT);
        assert!(email.text.contains(LOGIN_URL));
    }
    assert!(sent[0].text.contains("User - Price"));
    assert!(sent[1].text.contains("Manager"));
}

#[tokio::test]
async fn test_changes_that_do_not_leave_pending_send_nothing() {
    let mailer = RecordingMailer::default();
    let jane = user("u1", "jane@example.com", "Jane");

    run_feed(
        mailer.clone(),
        SharedLedger::default(),
        vec![
            change(&jane, Role::UserWithPrice, Role::Manager),
            change(&jane, Role::Manager, Role::Admin),
            change(&jane, Role::Admin, Role::Pending),
            change(&jane, Role::Pending, Role::Pending),
        ],
    )
    .await;

    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_duplicate_event_sends_once() {
    let mailer = RecordingMailer::default();
    let jane = user("u1", "jane@example.com", "Jane");
    let activation = change(&jane, Role::Pending, Role::UserWithoutPrice);

    run_feed(
        mailer.clone(),
        SharedLedger::default(),
        vec![activation.clone(), activation],
    )
    .await;

    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_reactivation_after_revert_sends_again() {
    let mailer = RecordingMailer::default();
    let jane = user("u1", "jane@example.com", "Jane");
    let second = change(&jane, Role::Pending, Role::Manager);

    run_feed(
        mailer.clone(),
        SharedLedger::default(),
        vec![
            change(&jane, Role::Pending, Role::UserWithPrice),
            change(&jane, Role::UserWithPrice, Role::Pending),
            second.clone(),
            second,
        ],
    )
    .await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].text.contains("User - Price"));
    assert!(sent[1].text.contains("Manager"));
}

#[tokio::test]
async fn test_ledger_survives_worker_restart() {
    let mailer = RecordingMailer::default();
    let ledger = SharedLedger::default();
    let jane = user("u1", "jane@example.com", "Jane");
    let activation = change(&jane, Role::Pending, Role::Admin);

    run_feed(mailer.clone(), ledger.clone(), vec![activation.clone()]).await;
    run_feed(mailer.clone(), ledger, vec![activation]).await;

    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_bad_recipient_does_not_block_the_feed() {
    let mailer = RecordingMailer {
        rejected: Some("bounce@example.com".to_string()),
        ..RecordingMailer::default()
    };
    let blank = user("u1", "", "No Email");
    let bounce = user("u2", "bounce@example.com", "Bounce");
    let jane = user("u3", "jane@example.com", "Jane");

    run_feed(
        mailer.clone(),
        SharedLedger::default(),
        vec![
            change(&blank, Role::Pending, Role::UserWithPrice),
            change(&bounce, Role::Pending, Role::UserWithPrice),
            change(&jane, Role::Pending, Role::UserWithPrice),
        ],
    )
    .await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.as_str(), "jane@example.com");
}

// =============================================================================
// Inline delivery
// =============================================================================

#[tokio::test]
async fn test_inline_delivery_outcomes() {
    let mailer = RecordingMailer::default();
    let n = notifier(mailer.clone(), SharedLedger::default());
    let jane = user("u1", "jane@example.com", "");

    let promotion = change(&jane, Role::UserWithPrice, Role::Manager);
    assert_eq!(n.deliver(&promotion).await.unwrap(), Outcome::NotTriggered);

    let activation = change(&jane, Role::Pending, Role::UserWithPrice);
    assert_eq!(n.deliver(&activation).await.unwrap(), Outcome::Sent);
    assert_eq!(n.deliver(&activation).await.unwrap(), Outcome::AlreadySent);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Valued Customer"));
}
