//! Outgoing email.
//!
//! The SMTP backend talks to a relay through `lettre`; the console backend
//! writes the message to the log so development setups can follow
//! activation links without a mail server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::info;

use crate::config::{EmailBackend, EmailConfig};

pub const ACTIVATION_SUBJECT: &str = "Activate your SmarTanom Account";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message. Called once per email, no retries.
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    fn backend(&self) -> &'static str;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .with_context(|| format!("Invalid SMTP host: {}", config.smtp_host))?;

        let mut builder = builder.port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config
            .from_address
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid from address: {}", config.from_address))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email
                .to
                .parse::<Mailbox>()
                .with_context(|| format!("Invalid recipient: {}", email.to))?)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .context("Failed to build email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "smtp"
    }
}

pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            "Email (console backend):\n{}",
            email.body
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "console"
    }
}

pub fn build_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.backend {
        EmailBackend::Console => Arc::new(ConsoleMailer),
        EmailBackend::Smtp => Arc::new(SmtpMailer::new(config)?),
    };
    info!(backend = mailer.backend(), "Mailer initialized");
    Ok(mailer)
}

#[must_use]
pub fn activation_email(to: &str, name: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: ACTIVATION_SUBJECT.to_string(),
        body: format!(
            "Hi {name},\n\n\
             Thanks for signing up for SmarTanom! Please click the link below to activate your account:\n\n\
             {link}\n\n\
             If you didn't register, please ignore this email.\n\n\
             - SmarTanom Team\n"
        ),
    }
}
