//! Download-link emails over an authenticated SMTP relay.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::error::ConfigError;

/// Implicit-TLS submission port. Any other port is assumed to speak STARTTLS.
const SMTPS_PORT: u16 = 465;

/// Sends the customer their download link. Reports failure as `false`.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_download_link(&self, to_address: &str, order_id: &str, link: &str) -> bool;
}

pub fn download_link_subject(order_id: &str) -> String {
    format!("Your iOS Certificate is Ready! - {}", order_id)
}

pub fn download_link_body(link: &str, brand: &str) -> String {
    format!(
        "Hello,\n\nYour certificate has been issued.\n\nDownload Link: {}\n\nThank you for choosing {}.",
        link, brand
    )
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    brand: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, ConfigError> {
        let from: Mailbox = config.from.parse().map_err(|e: lettre::address::AddressError| {
            ConfigError::Invalid {
                name: "MAIL_FROM",
                value: config.from.clone(),
                reason: e.to_string(),
            }
        })?;

        let relay = if config.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let builder = relay.map_err(|e| ConfigError::Invalid {
            name: "SMTP_HOST",
            value: config.host.clone(),
            reason: e.to_string(),
        })?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        Ok(Self {
            transport,
            from,
            brand: config.brand.clone(),
        })
    }

    fn compose(&self, to_address: &str, order_id: &str, link: &str) -> Result<Message, String> {
        let to: Mailbox = to_address
            .parse()
            .map_err(|e| format!("Invalid recipient address {}: {}", to_address, e))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(download_link_subject(order_id))
            .header(ContentType::TEXT_PLAIN)
            .body(download_link_body(link, &self.brand))
            .map_err(|e| format!("Could not build message: {}", e))
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send_download_link(&self, to_address: &str, order_id: &str, link: &str) -> bool {
        let message = match self.compose(to_address, order_id, link) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(order_id = %order_id, "Email error: {}", e);
                return false;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(order_id = %order_id, "Sent download link to {}", to_address);
                true
            }
            Err(e) => {
                tracing::error!(order_id = %order_id, "Email error: {}", e);
                false
            }
        }
    }
}
