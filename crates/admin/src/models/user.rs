//! User account documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cnb_core::{Email, EmailError, Role, UserUid};

/// Name used in greetings when a user has none on file.
pub const FALLBACK_NAME: &str = "Valued Customer";

/// A document in the `users` collection, keyed by `uid`.
///
/// Written by the signup flow with role `Pending`, so `email` is kept as the
/// raw stored string and only parsed where it is used as a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserUid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// A freshly signed-up account awaiting approval.
    #[must_use]
    pub fn pending(uid: UserUid, email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid,
            email: email.into(),
            name: name.into(),
            company_name: None,
            full_name: None,
            role: Role::Pending,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Name for greetings: `name`, then `fullName`, then the fallback.
    #[must_use]
    pub fn display_name(&self) -> &str {
        [Some(self.name.as_str()), self.full_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME)
    }

    /// The stored email as a validated recipient.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] when the field is blank or malformed.
    pub fn recipient(&self) -> Result<Email, EmailError> {
        Email::parse(&self.email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_document_deserializes() {
        let json = r#"{
            "uid": "u1",
            "email": "buyer@example.com",
            "name": "Dana",
            "companyName": "Rug Barn",
            "role": "Pending",
            "createdAt": "2024-02-01T10:00:00Z"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Pending);
        assert_eq!(user.company_name.as_deref(), Some("Rug Barn"));
        assert!(user.updated_at.is_none());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut user = User::pending(UserUid::new("u1"), "a@b.co", "  ");
        assert_eq!(user.display_name(), FALLBACK_NAME);

        user.full_name = Some("Dana Smith".into());
        assert_eq!(user.display_name(), "Dana Smith");

        user.name = "Dana".into();
        assert_eq!(user.display_name(), "Dana");
    }

    #[test]
    fn test_recipient_validation() {
        let mut user = User::pending(UserUid::new("u1"), "", "Dana");
        assert!(user.recipient().is_err());
        user.email = "dana@example.com".into();
        assert_eq!(user.recipient().unwrap().as_str(), "dana@example.com");
    }
}
