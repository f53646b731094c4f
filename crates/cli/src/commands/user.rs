//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a pending test account (identity account + user document)
//! cnb-cli user create-test
//!
//! # Assign a role and send the activation email if the account leaves Pending
//! cnb-cli user set-role --uid abc123 --role "User - Price"
//! ```
//!
//! # Environment Variables
//!
//! - `CNB_DATABASE_URL` - `PostgreSQL` connection string
//! - `FIREBASE_*` - identity provider settings (`create-test`)
//! - `SMTP_*` - mail relay settings (`set-role`)

use chrono::Utc;
use thiserror::Error;

use cnb_admin::config::{
    ConfigError, NotifierConfig, database_url_from_env, email_from_env, firebase_from_env,
};
use cnb_admin::db::{self, PgNotificationLedger, RepositoryError, UserRepository};
use cnb_admin::models::User;
use cnb_admin::services::notifier::{NotifierError, Outcome};
use cnb_admin::services::{
    EmailError, EmailService, FirebaseAuthClient, IdentityError, RoleChangeNotifier,
};
use cnb_core::{Role, UserUid};

/// Password given to every generated test account.
pub const TEST_PASSWORD: &str = "testpassword123";

/// Display name given to every generated test account.
pub const TEST_NAME: &str = "Test User";

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("Notification failed: {0}")]
    Notifier(#[from] NotifierError),
}

/// Email address for a test account created at `millis` since the epoch.
#[must_use]
pub fn test_email(millis: i64) -> String {
    format!("test{millis}@example.com")
}

/// Create a test account in `Pending` state.
///
/// Registers the identity account first, then writes the matching user
/// document the way the signup form does.
///
/// # Errors
///
/// Returns `UserCommandError` if configuration is missing or either write fails.
pub async fn create_test() -> Result<UserUid, UserCommandError> {
    let identity = FirebaseAuthClient::new(&firebase_from_env()?)?;
    let pool = db::create_pool(&database_url_from_env()?).await?;

    let email = test_email(Utc::now().timestamp_millis());
    tracing::info!(email = %email, "Creating test account");

    let uid = identity
        .create_account(&email, TEST_PASSWORD, TEST_NAME)
        .await?;
    UserRepository::new(&pool)
        .insert(&User::pending(uid.clone(), &email, TEST_NAME))
        .await?;

    tracing::info!(uid = %uid, email = %email, "Test account created");
    tracing::info!("Sign in with password: {}", TEST_PASSWORD);
    Ok(uid)
}

/// Assign a role and run the activation notifier for the change inline.
///
/// # Errors
///
/// Returns `UserCommandError` if the user does not exist, configuration is
/// missing, or the activation email could not be delivered.
pub async fn set_role(uid: &UserUid, role: Role) -> Result<Outcome, UserCommandError> {
    let email_config = email_from_env()?;
    let pool = db::create_pool(&database_url_from_env()?).await?;

    let change = UserRepository::new(&pool).update_role(uid, role).await?;
    tracing::info!(uid = %uid, from = %change.before.role, to = %change.after.role, "Role assigned");

    let notifier = RoleChangeNotifier::new(
        EmailService::new(&email_config).map_err(EmailError::from)?,
        PgNotificationLedger::new(pool.clone()),
        email_config.login_url.clone(),
        NotifierConfig::default(),
    );
    let outcome = notifier.deliver(&change.into()).await?;

    tracing::info!(uid = %uid, outcome = ?outcome, "Notification handled");
    Ok(outcome)
}
