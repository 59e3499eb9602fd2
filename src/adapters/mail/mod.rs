use crate::config::SMTP_SSL_PORT;
use crate::domain::delivery::OutboundMessage;
use async_trait::async_trait;
use thiserror::Error;

pub mod smtp;

pub use smtp::SmtpMailTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("SMTP transport is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("Invalid message: {0}")]
    Message(String),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Relay unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Whether replaying the same message could succeed.
    ///
    /// Configuration and message-construction errors never do, nor does a permanent (5xx)
    /// rejection from the relay. Connection failures, timeouts and 4xx replies are retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotConfigured(_) | Self::Message(_) => false,
            Self::Smtp(e) => !e.is_permanent(),
            Self::Unavailable(_) => true,
        }
    }
}

/// How the connection to the relay is secured, fixed by the relay port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// TLS from the first byte (SMTPS).
    ImplicitTls,
    /// Plaintext greeting, upgraded with STARTTLS before authenticating.
    StartTls,
}

impl SecurityMode {
    #[must_use]
    pub const fn for_port(port: u16) -> Self {
        if port == SMTP_SSL_PORT { Self::ImplicitTls } else { Self::StartTls }
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Sends a single message, opening and closing one connection to the relay.
    ///
    /// # Errors
    /// Returns `TransportError` if connecting, securing, authenticating or transmitting fails.
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}
