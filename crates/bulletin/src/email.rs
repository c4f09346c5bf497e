//! Email delivery over SMTP.
//!
//! [`EmailServer`] owns a [`MailTransport`] and the sender address. The SMTP
//! transport is lettre's pooled STARTTLS relay; its connections are closed
//! when the server is dropped.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::SmtpConfig;
use crate::error::{BulletinError, Result};

/// One or more recipient addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    /// Iterate over the addresses in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Self::One(address) => std::slice::from_ref(address),
            Self::Many(addresses) => addresses.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    /// Parse every address into a mailbox.
    pub fn mailboxes(&self) -> Result<Vec<Mailbox>> {
        self.iter()
            .map(|address| address.parse::<Mailbox>().map_err(BulletinError::from))
            .collect()
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Self::One(address.to_string())
    }
}

impl From<String> for Recipients {
    fn from(address: String) -> Self {
        Self::One(address)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addresses: Vec<String>) -> Self {
        Self::Many(addresses)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(addresses: Vec<&str>) -> Self {
        Self::Many(addresses.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Recipients {
    fn from(addresses: &[&str]) -> Self {
        Self::Many(addresses.iter().map(|a| (*a).to_string()).collect())
    }
}

/// An HTML email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub html: String,
}

impl Email {
    /// Build the MIME message: every recipient in `To`, an HTML body.
    pub fn to_message(&self) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject.as_str());
        for to in &self.to {
            builder = builder.to(to.clone());
        }

        Ok(builder
            .header(ContentType::TEXT_HTML)
            .body(self.html.clone())?)
    }
}

/// Outbound mail delivery.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver a message, failing on authentication or delivery errors.
    async fn send(&self, email: &Email) -> Result<()>;
}

#[async_trait]
impl MailTransport for AsyncSmtpTransport<Tokio1Executor> {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = email.to_message()?;
        AsyncTransport::send(self, message)
            .await
            .map_err(BulletinError::transport)?;
        Ok(())
    }
}

/// Transport wrapper used by bulletins to send their rendered output.
pub struct EmailServer {
    sender: Option<Mailbox>,
    transport: Option<Box<dyn MailTransport>>,
}

impl EmailServer {
    /// Create a server sending as `sender` over the given transport.
    pub fn new(sender: &str, transport: impl MailTransport + 'static) -> Result<Self> {
        Ok(Self {
            sender: Some(sender.parse()?),
            transport: Some(Box::new(transport)),
        })
    }

    /// Connect to an SMTP relay with STARTTLS and verify the login.
    ///
    /// The authenticating user is also the sender.
    pub async fn connect(config: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(BulletinError::transport)?
                .port(config.port)
                .credentials(creds)
                .build();

        let connected = transport
            .test_connection()
            .await
            .map_err(BulletinError::transport)?;
        if !connected {
            return Err(BulletinError::transport(format!(
                "could not connect to {}:{}",
                config.host, config.port
            )));
        }

        info!(host = %config.host, port = config.port, "Connected to SMTP server");
        Self::new(&config.username, transport)
    }

    /// A server that refuses to send; for rendering without delivery.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            sender: None,
            transport: None,
        }
    }

    #[must_use]
    pub const fn sender(&self) -> Option<&Mailbox> {
        self.sender.as_ref()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send an HTML email to one or more recipients.
    pub async fn send(&self, recipients: &Recipients, subject: &str, html: &str) -> Result<()> {
        let (Some(sender), Some(transport)) = (&self.sender, &self.transport) else {
            debug!("Email server disabled, refusing to send");
            return Err(BulletinError::TransportDisabled);
        };

        let email = Email {
            from: sender.clone(),
            to: recipients.mailboxes()?,
            subject: subject.to_string(),
            html: html.to_string(),
        };
        transport.send(&email).await?;

        info!(
            to = ?recipients.iter().collect::<Vec<_>>(),
            subject = subject,
            "Email sent successfully"
        );
        Ok(())
    }
}
