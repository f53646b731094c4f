//! Email service for account activation notices.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates.

use std::future::Future;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use cnb_core::{Email, Role};

use crate::config::EmailConfig;

/// Subject line of the activation email.
pub const ACTIVATION_SUBJECT: &str = "Welcome to CNB Carpets - Your Account is Activated!";

/// Logo shown at the top of HTML emails.
pub const LOGO_URL: &str = "https://cnb-web.vercel.app/cnb-web.png";

#[derive(Template)]
#[template(path = "email/activation.html")]
struct ActivationEmailHtml<'a> {
    subject: &'a str,
    logo_url: &'a str,
    name: &'a str,
    role: &'a str,
    access_info: &'a str,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/activation.txt")]
struct ActivationEmailText<'a> {
    name: &'a str,
    role: &'a str,
    access_info: &'a str,
    login_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl EmailError {
    /// Whether resending the same message cannot succeed.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Smtp(e) => e.is_permanent(),
            Self::InvalidAddress(_) | Self::MessageBuild(_) | Self::Template(_) => true,
        }
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Email,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render the activation email for a newly approved account.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn activation_email(
    to: Email,
    name: &str,
    role: Role,
    access_info: &str,
    login_url: &str,
) -> Result<OutgoingEmail, EmailError> {
    let role = role.as_str();
    let html = ActivationEmailHtml {
        subject: ACTIVATION_SUBJECT,
        logo_url: LOGO_URL,
        name,
        role,
        access_info,
        login_url,
    }
    .render()?;
    let text = ActivationEmailText {
        name,
        role,
        access_info,
        login_url,
    }
    .render()?;

    Ok(OutgoingEmail {
        to,
        subject: ACTIVATION_SUBJECT.to_string(),
        text,
        html,
    })
}

/// Anything that can deliver an [`OutgoingEmail`].
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> impl Future<Output = Result<(), EmailError>> + Send;
}

/// SMTP-backed mailer.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.to_string()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;
        Ok(message)
    }
}

impl Mailer for EmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = self.build_message(email)?;
        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn render(name: &str) -> OutgoingEmail {
        activation_email(
            Email::parse("jane@example.com").unwrap(),
            name,
            Role::UserWithPrice,
            "You have been granted access to view our full catalog including pricing information.",
            "https://cnb-web.vercel.app/login",
        )
        .unwrap()
    }

    #[test]
    fn test_activation_email_content() {
        let email = render("Jane");
        assert_eq!(email.subject, ACTIVATION_SUBJECT);
        assert_eq!(email.to.as_str(), "jane@example.com");

        for body in [&email.html, &email.text] {
            assert!(body.contains("Welcome to CNB Carpets, Jane!"));
            assert!(body.contains("User - Price"));
            assert!(body.contains("including pricing information."));
            assert!(body.contains("https://cnb-web.vercel.app/login"));
            assert!(body.contains("The CNB Carpets Team"));
        }
        assert!(email.html.contains("#FB8A13"));
        assert!(email.html.contains(LOGO_URL));
    }

    #[test]
    fn test_activation_email_escapes_name_in_html() {
        let email = render("<b>Jane</b>");
        assert!(!email.html.contains("<b>Jane</b>"));
        assert!(email.text.contains("<b>Jane</b>"));
    }

    #[test]
    fn test_permanent_errors() {
        assert!(EmailError::InvalidAddress("x".into()).is_permanent());
    }

    /// Minimal SMTP relay that refuses every recipient with `rcpt_reply`.
    async fn refusing_relay(rcpt_reply: &'static str) -> u16 {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            write.write_all(b"220 localhost ESMTP\r\n").await.unwrap();
            while let Ok(Some(line)) = lines.next_line().await {
                let verb = line.get(..4).unwrap_or_default().to_ascii_uppercase();
                let reply = match verb.as_str() {
                    "RCPT" => rcpt_reply,
                    "QUIT" => "221 bye\r\n",
                    _ => "250 OK\r\n",
                };
                if write.write_all(reply.as_bytes()).await.is_err() || verb == "QUIT" {
                    break;
                }
            }
        });
        port
    }

    async fn send_via(port: u16) -> EmailError {
        let service = EmailService {
            mailer: AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("127.0.0.1")
                .port(port)
                .build(),
            from_address: "noreply@cnbcarpets.com".to_string(),
        };
        service.send(&render("Jane")).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_smtp_rejection_is_permanent() {
        let port = refusing_relay("550 5.1.1 Mailbox unavailable\r\n").await;
        let err = send_via(port).await;
        assert!(matches!(err, EmailError::Smtp(_)));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_smtp_deferral_is_transient() {
        let port = refusing_relay("451 4.3.0 Try again later\r\n").await;
        let err = send_via(port).await;
        assert!(matches!(err, EmailError::Smtp(_)));
        assert!(!err.is_permanent());
    }
}
