//! Transactional email delivery.
//!
//! [`Mailer`] is the single sending capability used by the lead flow. Two
//! transports implement it: [`SmtpMailer`] wraps the `lettre` async SMTP
//! transport, [`HttpMailer`] posts JSON to an HTTP email API. Which one runs
//! is decided once at startup from [`MailConfig`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;

use crate::config::{MailConfig, MailTransport};

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// No transport is configured.
    #[error("mail provider is not configured")]
    NotConfigured,

    /// The recipient or sender address could not be parsed.
    #[error("email address parse error: {0}")]
    Address(String),

    /// The MIME message could not be assembled.
    #[error("email build error: {0}")]
    Build(String),

    /// Transport-level failure (connection, TLS, authentication, timeout).
    #[error("mail transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered HTML email ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Acknowledgement from the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentEmail {
    /// Provider-side message identifier or response line, when one is returned.
    pub provider_id: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, SendError>;
}

/// A mailer bound to the fixed internal sales recipient.
#[derive(Clone)]
pub struct Notifier {
    pub mailer: Arc<dyn Mailer>,
    pub sales_address: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, sales_address: impl Into<String>) -> Self {
        Self {
            mailer,
            sales_address: sales_address.into(),
        }
    }

    /// Builds the notifier described by the mail configuration.
    pub fn from_config(config: &MailConfig) -> Result<Self, SendError> {
        let mailer: Arc<dyn Mailer> = match &config.transport {
            MailTransport::Smtp {
                host,
                port,
                username,
                password,
            } => Arc::new(SmtpMailer::new(
                host,
                *port,
                username.as_deref().zip(password.as_deref()),
                &config.from_address,
            )?),
            MailTransport::HttpApi { api_url, api_key } => Arc::new(HttpMailer::new(
                api_url.clone(),
                api_key.clone(),
                config.from_address.clone(),
            )?),
        };

        Ok(Self::new(mailer, config.sales_address.clone()))
    }
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// Sends email through an SMTP relay using STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(&str, &str)>,
        from_address: &str,
    ) -> Result<Self, SendError> {
        let from: Mailbox = from_address
            .parse()
            .map_err(|e: lettre::address::AddressError| SendError::Address(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| SendError::Transport(e.to_string()))?
            .port(port)
            .timeout(Some(Duration::from_secs(30)));

        if let Some((user, pass)) = credentials {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, SendError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| SendError::Address(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| SendError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent via SMTP");
        Ok(SentEmail {
            provider_id: response.first_line().map(str::to_string),
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP API
// ---------------------------------------------------------------------------

/// Sends email through a JSON HTTP API (`POST {from, to, subject, html}`).
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    /// Creates a new `HttpMailer`.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Full URL of the provider's send endpoint.
    /// * `api_key` - Bearer token for the provider.
    /// * `from` - Sender address.
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SendError::Transport(format!("Failed to create mail client: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, SendError> {
        let body = json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Transport(format!("Mail API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SendError::Rejected {
                status,
                body: error_text,
            });
        }

        // Providers differ in their success body; the id is informational only.
        let provider_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string));

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent via HTTP API");
        Ok(SentEmail { provider_id })
    }
}
