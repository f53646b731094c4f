//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CNB_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CNB_BASE_URL` - Public URL of the admin API
//! - `CNB_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `FIREBASE_PROJECT_ID` - Firebase project that owns the user accounts
//! - `FIREBASE_API_KEY` - Web API key (password sign-in, token lookup)
//! - `FIREBASE_SERVICE_TOKEN` - OAuth bearer token with admin rights (account deletion, storage)
//! - `FIREBASE_STORAGE_BUCKET` - Storage bucket for catalog images
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address
//!
//! ## Optional
//! - `CNB_HOST` - Bind address (default: 127.0.0.1)
//! - `CNB_PORT` - Listen port (default: 3001)
//! - `CNB_LOGIN_URL` - Link placed in activation emails
//! - `FIREBASE_AUTH_URL` - Identity Toolkit base URL (emulator override)
//! - `FIREBASE_STORAGE_URL` - Storage base URL (emulator override)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `NOTIFIER_MAX_ATTEMPTS` - Delivery attempts per role change (default: 5)
//! - `NOTIFIER_BACKOFF_MS` - Initial retry delay, doubled per attempt (default: 1000)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `CNB_TLS_CERT` - PEM-encoded certificate chain
//! - `CNB_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";
pub const DEFAULT_LOGIN_URL: &str = "https://cnb-web.vercel.app/login";

/// Case-insensitive fragments that mark a secret as a placeholder.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin service configuration.
#[derive(Debug, Clone)]
pub struct CnbConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL of the admin API
    pub base_url: String,
    pub session_secret: SecretString,
    pub firebase: FirebaseConfig,
    pub email: EmailConfig,
    pub notifier: NotifierConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    pub tls: Option<TlsConfig>,
}

/// Firebase project settings shared by the identity and storage clients.
///
/// Implements `Debug` manually to redact the credentials.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    /// Web API key, sent as `?key=` on Identity Toolkit calls
    pub api_key: SecretString,
    /// OAuth bearer token for privileged calls
    pub service_token: SecretString,
    pub storage_bucket: String,
    pub auth_url: String,
    pub storage_url: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("service_token", &"[REDACTED]")
            .field("storage_bucket", &self.storage_bucket)
            .field("auth_url", &self.auth_url)
            .field("storage_url", &self.storage_url)
            .finish()
    }
}

impl FirebaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: get_required_env("FIREBASE_PROJECT_ID")?,
            api_key: get_required_secret("FIREBASE_API_KEY")?,
            service_token: get_validated_secret("FIREBASE_SERVICE_TOKEN")?,
            storage_bucket: get_required_env("FIREBASE_STORAGE_BUCKET")?,
            auth_url: get_url_or_default("FIREBASE_AUTH_URL", DEFAULT_AUTH_URL)?,
            storage_url: get_url_or_default("FIREBASE_STORAGE_URL", DEFAULT_STORAGE_URL)?,
        })
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Sign-in link placed in activation emails
    pub login_url: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("login_url", &self.login_url)
            .finish()
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: get_parsed_or_default("SMTP_PORT", 587)?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
            login_url: get_url_or_default("CNB_LOGIN_URL", DEFAULT_LOGIN_URL)?,
        })
    }
}

/// Retry policy of the role-change notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Delivery attempts per event, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each failure
    pub initial_backoff: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl NotifierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts: u32 = get_parsed_or_default("NOTIFIER_MAX_ATTEMPTS", 5)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "NOTIFIER_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let backoff_ms: u64 = get_parsed_or_default("NOTIFIER_BACKOFF_MS", 1000)?;
        Ok(Self {
            max_attempts,
            initial_backoff: Duration::from_millis(backoff_ms),
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (get_optional_env("CNB_TLS_CERT"), get_optional_env("CNB_TLS_KEY")) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "CNB_TLS_*".to_string(),
                "Both CNB_TLS_CERT and CNB_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl CnbConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CNB_DATABASE_URL")?;
        let host = get_parsed_or_default("CNB_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = get_parsed_or_default("CNB_PORT", 3001)?;
        let base_url = get_required_env("CNB_BASE_URL")?;
        let session_secret = get_validated_secret("CNB_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "CNB_SESSION_SECRET")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            firebase: FirebaseConfig::from_env()?,
            email: EmailConfig::from_env()?,
            notifier: NotifierConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_optional_env("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            sentry_traces_sample_rate: get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
            tls: TlsConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load only the database URL, for tools that need nothing else.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` when neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("CNB_DATABASE_URL")
}

/// Load only the Firebase settings.
///
/// # Errors
///
/// Returns `ConfigError` if a required Firebase variable is missing or invalid.
pub fn firebase_from_env() -> Result<FirebaseConfig, ConfigError> {
    let _ = dotenvy::dotenv();
    FirebaseConfig::from_env()
}

/// Load only the SMTP settings.
///
/// # Errors
///
/// Returns `ConfigError` if a required SMTP variable is missing or invalid.
pub fn email_from_env() -> Result<EmailConfig, ConfigError> {
    let _ = dotenvy::dotenv();
    EmailConfig::from_env()
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    get_required_env(key).map(SecretString::from)
}

/// Database URL with fallback to the generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// An absolute URL, trailing slash removed.
fn get_url_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = get_optional_env(key).unwrap_or_else(|| default.to_string());
    url::Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn firebase() -> FirebaseConfig {
        FirebaseConfig {
            project_id: "cnb-web".to_string(),
            api_key: SecretString::from("AIzaSyD-super-secret-web-key"),
            service_token: SecretString::from("ya29.super-secret-token"),
            storage_bucket: "cnb-web.appspot.com".to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
        }
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        for value in ["your-session-key-here", "changeme123", "REPLACE_ME_PLEASE"] {
            let err = validate_secret_strength(value, "TEST_VAR").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{value}");
        }
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_notifier_defaults() {
        let config = NotifierConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_socket_addr() {
        let config = CnbConfig {
            database_url: SecretString::from("postgres://localhost/cnb"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            firebase: firebase(),
            email: EmailConfig {
                smtp_host: "smtp.example.com".to_string(),
                smtp_port: 587,
                smtp_username: "user".to_string(),
                smtp_password: SecretString::from("pass"),
                from_address: "noreply@cnbcarpets.com".to_string(),
                login_url: DEFAULT_LOGIN_URL.to_string(),
            },
            notifier: NotifierConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
            tls: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_firebase_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", firebase());

        assert!(debug_output.contains("cnb-web.appspot.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-web-key"));
        assert!(!debug_output.contains("super-secret-token"));
    }

    #[test]
    fn test_email_config_debug_redacts_secrets() {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer@cnbcarpets.com".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "noreply@cnbcarpets.com".to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("mailer@cnbcarpets.com"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
