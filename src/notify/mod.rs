use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;

use crate::config::SmtpConfig;
use crate::{MashupError, Result};

pub const SUBJECT: &str = "Mashup Result";

pub const BODY: &str = "Hello!

Your mashup has been generated successfully. Please find the attached zip file containing your audio mashup.

Thank you for using our Mashup service!

Best regards,
Mashup Team
";

/// Delivers the finished archive to the requester
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `archive` to `to`; failures are final, nothing is retried
    async fn send(&self, to: &str, archive: &Path) -> Result<()>;
}

/// Mailer speaking SMTP with STARTTLS and login credentials
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.config.email, &self.config.password) {
            (Some(email), Some(password)) => Ok((email.as_str(), password.as_str())),
            _ => Err(MashupError::MailNotConfigured.into()),
        }
    }
}

/// Compose the result message with the archive attached
pub fn build_message(from: &str, to: &str, archive_name: &str, archive: Vec<u8>) -> Result<Message> {
    let from: Mailbox = from.parse().with_context(|| format!("Invalid sender address: {}", from))?;
    let to: Mailbox = to.parse().with_context(|| format!("Invalid recipient address: {}", to))?;
    let zip_type = ContentType::parse("application/zip").context("Invalid attachment content type")?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(Attachment::new(archive_name.to_string()).body(archive, zip_type)),
        )
        .context("Failed to build email")?;

    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, archive: &Path) -> Result<()> {
        let (email, password) = self.credentials()?;

        let archive_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mashup.zip".to_string());
        let bytes = tokio::fs::read(archive)
            .await
            .with_context(|| format!("Failed to read {}", archive.display()))?;
        let message = build_message(email, to, &archive_name, bytes)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.server)
            .with_context(|| format!("Failed to set up SMTP relay {}", self.config.server))?
            .port(self.config.port)
            .credentials(Credentials::new(email.to_string(), password.to_string()))
            .build();

        tracing::debug!("Sending mashup to {} via {}:{}", to, self.config.server, self.config.port);
        transport
            .send(message)
            .await
            .with_context(|| format!("Failed to send email to {}", to))?;

        Ok(())
    }
}
