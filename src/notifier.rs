//! # Report Delivery
//!
//! A [`Notifier`] delivers one finished report. Two implementations exist:
//!
//! - [`ConsoleNotifier`]: prints to stdout (also the `--stdout` dev mode)
//! - [`EmailNotifier`]: sends a plain-text email over SMTP with STARTTLS
//!
//! Which one runs is decided once from configuration in [`from_config`].
//! Delivery is attempted exactly once; a failure is returned to the caller and
//! never retried here.

use crate::config::{Config, EmailConfig};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;

/// Errors at the delivery boundary.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Writing the report to stdout failed
    #[error("console output failed: {0}")]
    Console(#[from] io::Error),

    /// Sender or recipient is not a valid mailbox
    #[error("invalid email address {address:?}: {reason}")]
    Address { address: String, reason: String },

    /// The email could not be assembled
    #[error("could not build email: {0}")]
    Message(#[from] lettre::error::Error),

    /// Connection, TLS, authentication or SMTP protocol failure
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Something that can deliver a finished report.
pub trait Notifier {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Deliver one message. Called at most once per run.
    fn notify(&self, subject: &str, message: &str) -> Result<(), NotifyError>;

    /// Whether a delivered report already lands on stdout
    fn writes_to_stdout(&self) -> bool {
        false
    }
}

/// Prints the report to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn name(&self) -> &'static str {
        "console"
    }

    fn notify(&self, _subject: &str, message: &str) -> Result<(), NotifyError> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", message)?;
        out.flush()?;
        Ok(())
    }

    fn writes_to_stdout(&self) -> bool {
        true
    }
}

/// Sends the report as a plain-text email.
pub struct EmailNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// Prepare an SMTP transport. Nothing is sent and no connection is opened.
    pub fn new(email: &EmailConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&email.sender)?;
        let to = parse_mailbox(&email.recipient)?;

        let transport = SmtpTransport::starttls_relay(&email.smtp_server)?
            .port(email.smtp_port)
            .credentials(Credentials::new(
                email.sender.clone(),
                email.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(EmailNotifier {
            transport,
            from,
            to,
        })
    }

    /// Assemble the email for a report.
    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        Ok(message)
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    fn notify(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        let email = self.build_message(subject, message)?;
        let response = self.transport.send(&email)?;
        log::debug!("SMTP server answered {:?}", response.code());
        log::info!("✅ Email notification sent to {}", self.to);
        Ok(())
    }
}

/// Pick the notifier for this run.
///
/// `force_console` wins over configuration, for trying things out locally.
pub fn from_config(config: &Config, force_console: bool) -> Result<Box<dyn Notifier>, NotifyError> {
    if force_console || !config.email.enabled {
        return Ok(Box::new(ConsoleNotifier));
    }
    let timeout = Duration::from_secs(config.api.timeout_secs);
    Ok(Box::new(EmailNotifier::new(&config.email, timeout)?))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}
