//! Email delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport. Configuration
//! is loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer should be built.

use async_trait::async_trait;
use chrono::Datelike;
use lettre::message::header::ContentType;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use imgocr_core::gateway::ImageMetadata;
use imgocr_core::notify::{render_ocr_result, DeliveryError, Notifier};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for DeliveryError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Transport(e) => DeliveryError::Transport(e.to_string()),
            EmailError::Address(e) => DeliveryError::Address(e.to_string()),
            EmailError::Build(msg) => DeliveryError::Build(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@imgocr.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Use STARTTLS. Plain SMTP when `false` (local relays, test servers).
    pub tls: bool,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                  |
    /// |-----------------|----------|--------------------------|
    /// | `SMTP_HOST`     | yes      |                          |
    /// | `SMTP_PORT`     | no       | `587`                    |
    /// | `SMTP_FROM`     | no       | `noreply@imgocr.local`   |
    /// | `SMTP_USER`     | no       |                          |
    /// | `SMTP_PASSWORD` | no       |                          |
    /// | `SMTP_TLS`      | no       | `true`                   |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            tls: std::env::var("SMTP_TLS")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        })
    }
}

// ---------------------------------------------------------------------------
// Message building
// ---------------------------------------------------------------------------

/// Build a plain-text message.
pub fn build_plain_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| EmailError::Build(e.to_string()))
}

/// Build the OCR result message with plain-text and HTML alternatives.
pub fn build_ocr_result_message(
    from: &str,
    to: &str,
    image: &ImageMetadata,
    text: &str,
    confidence: f64,
) -> Result<Message, EmailError> {
    let rendered = render_ocr_result(image, text, confidence, chrono::Utc::now().year());
    Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(rendered.subject)
        .multipart(MultiPart::alternative_plain_html(rendered.plain, rendered.html))
        .map_err(|e| EmailError::Build(e.to_string()))
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends email via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Create the delivery service and its SMTP transport.
    ///
    /// No connection is opened until the first message is sent.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            config,
        })
    }

    async fn deliver(&self, to: &str, message: Message) -> Result<(), EmailError> {
        self.mailer.send(message).await?;
        tracing::info!(to, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailDelivery {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = build_plain_message(&self.config.from_address, to, subject, body)?;
        self.deliver(to, message).await.map_err(|e| {
            tracing::error!(to, error = %e, "Failed to send email");
            e.into()
        })
    }

    async fn send_ocr_result(
        &self,
        to: &str,
        image: &ImageMetadata,
        text: &str,
        confidence: f64,
    ) -> Result<(), DeliveryError> {
        let message =
            build_ocr_result_message(&self.config.from_address, to, image, text, confidence)?;
        self.deliver(to, message).await.map_err(|e| {
            tracing::error!(to, image_id = %image.id, error = %e, "Failed to send OCR result email");
            e.into()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
