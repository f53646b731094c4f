//! User roles.
//!
//! The role stored on a user document is the only authorization signal in the
//! system. Its serialized form is the exact string the signup flow and the
//! dashboard write into the `role` field, so existing documents deserialize
//! without migration.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Account role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Role {
    /// Full administrative access, including user management.
    Admin,
    /// Catalog management without user administration.
    Manager,
    /// Catalog access with pricing visible.
    #[serde(rename = "User - Price")]
    UserWithPrice,
    /// Catalog access with pricing hidden.
    #[serde(rename = "User - No Price")]
    UserWithoutPrice,
    /// Newly signed-up account awaiting approval.
    #[default]
    Pending,
}

impl Role {
    /// All roles, in the order the dashboard offers them.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Manager,
        Self::UserWithPrice,
        Self::UserWithoutPrice,
        Self::Pending,
    ];

    /// The stored/displayed string for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::UserWithPrice => "User - Price",
            Self::UserWithoutPrice => "User - No Price",
            Self::Pending => "Pending",
        }
    }

    /// Whether the account is still awaiting activation.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    /// Accepts the stored strings plus the CLI-friendly snake-case aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Admin" | "admin" => Ok(Self::Admin),
            "Manager" | "manager" => Ok(Self::Manager),
            "User - Price" | "user_price" => Ok(Self::UserWithPrice),
            "User - No Price" | "user_no_price" => Ok(Self::UserWithoutPrice),
            "Pending" | "pending" => Ok(Self::Pending),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}
