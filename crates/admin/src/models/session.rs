//! Session-stored identity.

use serde::{Deserialize, Serialize};

use cnb_core::{Role, UserUid};

/// The signed-in user as recorded at login.
///
/// The role here is informational; privileged requests re-read the role
/// from the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserUid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}
