use crate::adapters::mail::{MailTransport, SecurityMode, TransportError};
use crate::config::SmtpConfig;
use crate::domain::delivery::OutboundMessage;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Relays messages through an authenticated SMTP server.
///
/// A fresh transport is built for every call, so each attempt opens exactly one connection.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    config: SmtpConfig,
}

impl SmtpMailTransport {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn security_mode(&self) -> SecurityMode {
        SecurityMode::for_port(self.config.port)
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, TransportError> {
        self.transport_for(self.security_mode())
    }

    fn transport_for(&self, mode: SecurityMode) -> Result<AsyncSmtpTransport<Tokio1Executor>, TransportError> {
        let host = required(self.config.host.as_deref(), "SMTP_HOST")?;
        let user = required(self.config.user.as_deref(), "SMTP_USER")?;
        let password = required(self.config.password.as_deref(), "SMTP_PASSWORD")?;

        let builder = match mode {
            SecurityMode::ImplicitTls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            SecurityMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
        };

        Ok(builder
            .port(self.config.port)
            .timeout(Some(self.config.timeout()))
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build())
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, TransportError> {
    value.map(str::trim).filter(|v| !v.is_empty()).ok_or(TransportError::NotConfigured(name))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address.parse().map_err(|e| TransportError::Message(format!("invalid address {address:?}: {e}")))
}

/// Converts an outbound message into a MIME plain-text email.
///
/// # Errors
/// Returns `TransportError::Message` if any address is malformed.
pub fn build_message(message: &OutboundMessage) -> Result<Message, TransportError> {
    let mut builder = Message::builder().from(parse_mailbox(&message.from)?).to(parse_mailbox(&message.to)?);

    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    builder
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| TransportError::Message(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    #[tracing::instrument(level = "debug", skip_all, fields(mode = ?self.security_mode(), port = self.config.port))]
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let email = build_message(message)?;
        let transport = self.build_transport()?;

        let response = transport.send(email).await?;
        tracing::debug!(code = %response.code(), "Relay accepted message");
        Ok(())
    }
}
