//! Authorization decisions.
//!
//! Every privileged request goes through [`authorize`]. Call sites never
//! compare role strings themselves.
//!
//! | Action            | Admin | Manager | other roles |
//! |-------------------|-------|---------|-------------|
//! | `AccessDashboard` | yes   | yes     | no          |
//! | `ManageCatalog`   | yes   | yes     | no          |
//! | `ViewUsers`       | yes   | yes     | no          |
//! | `ChangeRole`      | yes   | no      | no          |
//! | `DeleteUser`      | yes   | no      | no          |

use serde::Serialize;

use crate::types::Role;

/// Something a user may attempt through the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Sign in to and read any admin page.
    AccessDashboard,
    /// Create, edit, reorder or delete categories, products, promotions and images.
    ManageCatalog,
    /// List user accounts.
    ViewUsers,
    /// Assign a role to a user.
    ChangeRole,
    /// Delete a user account.
    DeleteUser,
}

impl Action {
    /// Human-readable description used in denial messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::AccessDashboard => "access the admin dashboard",
            Self::ManageCatalog => "manage the catalog",
            Self::ViewUsers => "view users",
            Self::ChangeRole => "modify user roles",
            Self::DeleteUser => "delete users",
        }
    }
}

/// Denial returned by [`authorize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role {role} is not allowed to {}", action.describe())]
pub struct AuthzError {
    pub role: Role,
    pub action: Action,
}

/// Decide whether `role` may perform `action`.
///
/// # Errors
///
/// Returns [`AuthzError`] when the role does not grant the action.
pub const fn authorize(role: Role, action: Action) -> Result<(), AuthzError> {
    let allowed = match action {
        Action::AccessDashboard | Action::ManageCatalog | Action::ViewUsers => {
            matches!(role, Role::Admin | Role::Manager)
        }
        Action::ChangeRole | Action::DeleteUser => matches!(role, Role::Admin),
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError { role, action })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [Action; 5] = [
        Action::AccessDashboard,
        Action::ManageCatalog,
        Action::ViewUsers,
        Action::ChangeRole,
        Action::DeleteUser,
    ];

    #[test]
    fn test_admin_can_do_everything() {
        for action in ALL_ACTIONS {
            assert!(authorize(Role::Admin, action).is_ok(), "{action:?}");
        }
    }

    #[test]
    fn test_manager_cannot_administer_users() {
        assert!(authorize(Role::Manager, Action::ManageCatalog).is_ok());
        assert!(authorize(Role::Manager, Action::ViewUsers).is_ok());
        assert!(authorize(Role::Manager, Action::ChangeRole).is_err());
        assert!(authorize(Role::Manager, Action::DeleteUser).is_err());
    }

    #[test]
    fn test_customer_roles_denied_everywhere() {
        for role in [Role::UserWithPrice, Role::UserWithoutPrice, Role::Pending] {
            for action in ALL_ACTIONS {
                assert!(authorize(role, action).is_err(), "{role} {action:?}");
            }
        }
    }

    #[test]
    fn test_denial_message() {
        let err = authorize(Role::Manager, Action::ChangeRole).unwrap_err();
        assert_eq!(err.to_string(), "role Manager is not allowed to modify user roles");
    }
}
