//! Business logic services for admin.
//!
//! # Services
//!
//! - `identity` - Identity provider client (sign-in, token lookup, account deletion)
//! - `storage` - Object storage for product and promotion images
//! - `email` - Activation email rendering and SMTP delivery
//! - `notifier` - Change feed consumer that sends activation emails
//! - `user_deletion` - Bearer-authenticated account deletion endpoint logic

pub mod email;
pub mod identity;
pub mod notifier;
pub mod storage;
pub mod user_deletion;

pub use email::{EmailError, EmailService, Mailer, OutgoingEmail};
pub use identity::{DeleteOutcome, FirebaseAuthClient, IdentityError, IdentityProvider};
pub use notifier::{ChangeFeed, NotificationKind, NotificationLedger, RoleChange, RoleChangeNotifier};
pub use storage::{StorageClient, StorageError};
pub use user_deletion::{DeletionError, RoleDirectory, delete_user};
