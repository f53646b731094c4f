//! Identity provider client (Firebase Identity Toolkit REST API).
//!
//! Credentials, ID tokens and account lifecycle live with the provider; this
//! service only talks to it.
//!
//! # API Reference
//!
//! - Base URL: `https://identitytoolkit.googleapis.com` (overridable for the emulator)
//! - `POST /v1/accounts:signInWithPassword?key=` - password sign-in
//! - `POST /v1/accounts:lookup?key=` - resolve an ID token to its account
//! - `POST /v1/projects/{project}/accounts` - create an account (bearer auth)
//! - `POST /v1/projects/{project}/accounts:delete` - delete an account (bearer auth)

use std::future::Future;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cnb_core::UserUid;

use crate::config::FirebaseConfig;

/// Errors that can occur when calling the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ID token is malformed, expired or revoked.
    #[error("invalid or expired ID token")]
    InvalidToken,

    /// Wrong email or password, or the account is disabled.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account not found")]
    UserNotFound,

    #[error("account already exists")]
    AlreadyExists,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// The account an ID token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: UserUid,
    pub email: Option<String>,
}

/// Result of a successful password sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub uid: UserUid,
    pub email: String,
    pub id_token: SecretString,
}

/// Outcome of an account deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The account did not exist; nothing to do.
    AlreadyAbsent,
}

/// The operations the deletion endpoint needs from the identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer ID token to its account.
    fn verify_id_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<VerifiedToken, IdentityError>> + Send;

    /// Delete an account. A missing account is reported, not an error.
    fn delete_account(
        &self,
        uid: &UserUid,
    ) -> impl Future<Output = Result<DeleteOutcome, IdentityError>> + Send;
}

/// Firebase Identity Toolkit client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    inner: Arc<FirebaseAuthInner>,
}

struct FirebaseAuthInner {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: SecretString,
    service_token: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountRequest<'a> {
    local_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    local_id: String,
}

/// `{"error": {"code": 400, "message": "USER_NOT_FOUND"}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a provider error code to a typed error.
///
/// Codes sometimes carry a detail suffix (`"TOO_MANY_ATTEMPTS_TRY_LATER : ..."`);
/// only the leading code is matched.
fn classify_error(status: u16, message: &str) -> IdentityError {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            IdentityError::InvalidToken
        }
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            IdentityError::InvalidCredentials
        }
        "USER_NOT_FOUND" => IdentityError::UserNotFound,
        "EMAIL_EXISTS" | "DUPLICATE_LOCAL_ID" => IdentityError::AlreadyExists,
        _ => IdentityError::Api {
            status,
            message: message.to_string(),
        },
    }
}

impl FirebaseAuthClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Arc::new(FirebaseAuthInner {
                client,
                base_url: config.auth_url.clone(),
                project_id: config.project_id.clone(),
                api_key: config.api_key.clone(),
                service_token: config.service_token.clone(),
            }),
        })
    }

    /// URL of a public (API-key) endpoint.
    fn keyed_url(&self, method: &str) -> Result<url::Url, IdentityError> {
        let mut url = url::Url::parse(&format!("{}/v1/accounts:{method}", self.inner.base_url))
            .map_err(|e| IdentityError::Parse(format!("invalid auth URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    /// URL of a project-scoped admin endpoint.
    fn project_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts{suffix}",
            self.inner.base_url, self.inner.project_id
        )
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` for a wrong email or
    /// password, or another variant if the call fails.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignIn, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.keyed_url("signInWithPassword")?)
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let body: SignInResponse = Self::handle_response(response).await?;
        Ok(SignIn {
            uid: UserUid::new(body.local_id),
            email: body.email,
            id_token: SecretString::from(body.id_token),
        })
    }

    /// Create an account and return its uid.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AlreadyExists` if the email is taken.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserUid, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.project_url(""))
            .bearer_auth(self.inner.service_token.expose_secret())
            .json(&CreateAccountRequest {
                email,
                password,
                display_name,
            })
            .send()
            .await?;

        let body: CreateAccountResponse = Self::handle_response(response).await?;
        tracing::info!(uid = %body.local_id, "Identity account created");
        Ok(UserUid::new(body.local_id))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, IdentityError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| IdentityError::Parse(format!("Failed to parse response: {e}")));
        }
        Err(Self::parse_error(response).await)
    }

    async fn parse_error(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        classify_error(status, &message)
    }
}

impl IdentityProvider for FirebaseAuthClient {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.keyed_url("lookup")?)
            .json(&LookupRequest { id_token: token })
            .send()
            .await?;

        let body: LookupResponse = match Self::handle_response(response).await {
            Ok(body) => body,
            Err(IdentityError::UserNotFound) => return Err(IdentityError::InvalidToken),
            Err(e) => return Err(e),
        };

        let user = body.users.into_iter().next().ok_or(IdentityError::InvalidToken)?;
        Ok(VerifiedToken {
            uid: UserUid::new(user.local_id),
            email: user.email,
        })
    }

    async fn delete_account(&self, uid: &UserUid) -> Result<DeleteOutcome, IdentityError> {
        let response = self
            .inner
            .client
            .post(self.project_url(":delete"))
            .bearer_auth(self.inner.service_token.expose_secret())
            .json(&AccountRequest {
                local_id: uid.as_str(),
            })
            .send()
            .await?;

        match Self::handle_response::<serde_json::Value>(response).await {
            Ok(_) => {
                tracing::info!(uid = %uid, "Identity account deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(IdentityError::UserNotFound) => {
                tracing::info!(uid = %uid, "Identity account already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for FirebaseAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseAuthClient")
            .field("base_url", &self.inner.base_url)
            .field("project_id", &self.inner.project_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_AUTH_URL, DEFAULT_STORAGE_URL};

    fn client() -> FirebaseAuthClient {
        FirebaseAuthClient::new(&FirebaseConfig {
            project_id: "cnb-web".to_string(),
            api_key: SecretString::from("web-key"),
            service_token: SecretString::from("svc-token"),
            storage_bucket: "cnb-web.appspot.com".to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_classify_error_codes() {
        assert!(matches!(classify_error(400, "USER_NOT_FOUND"), IdentityError::UserNotFound));
        assert!(matches!(classify_error(400, "INVALID_ID_TOKEN"), IdentityError::InvalidToken));
        assert!(matches!(
            classify_error(400, "INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            classify_error(400, "TOKEN_EXPIRED : The user's credential is no longer valid."),
            IdentityError::InvalidToken
        ));
        assert!(matches!(
            classify_error(503, "BACKEND_ERROR"),
            IdentityError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_urls() {
        let client = client();
        let url = client.keyed_url("lookup").unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:lookup?key=web-key"
        );
        assert_eq!(
            client.project_url(":delete"),
            "https://identitytoolkit.googleapis.com/v1/projects/cnb-web/accounts:delete"
        );
    }

    #[test]
    fn test_debug_hides_credentials() {
        let debug_output = format!("{:?}", client());
        assert!(debug_output.contains("cnb-web"));
        assert!(!debug_output.contains("web-key"));
        assert!(!debug_output.contains("svc-token"));
    }
}
